//! Request contracts: status codes, responses, content types and transports.

pub mod file;
pub mod local;
pub mod mime;
pub mod request;
pub mod status;
pub mod url;

pub use file::DefaultTransports;
pub use local::LocalHub;
pub use local::PendingFeed;
pub use mime::ContentKind;
pub use mime::ContentType;
pub use request::GmResponse;
pub use request::NoticeKind;
pub use request::NoticeReceiver;
pub use request::NoticeSender;
pub use request::Request;
pub use request::RequestId;
pub use request::RequestNotice;
pub use request::ResponseFeed;
pub use request::Transport;
pub use request::TransportFactory;
pub use request::notice_channel;
pub use status::StatusCategory;
pub use status::StatusCode;
pub use status::StatusError;
pub use url::GemUrl;
