use gd_anim::SystemClock;
use gd_core::RangeI;
use gd_document::Run;
use gd_ipc::EventReceiver;
use gd_ipc::local_event_channel;
use gd_net::DefaultTransports;
use gd_render::RecordingPainter;
use gd_session::DocumentSession;
use gd_session::SessionConfig;
use gd_session::SessionContext;
use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use std::time::Instant;
use url::Url;

include!("constants.rs");
include!("types.rs");

mod runtime;
mod startup;

pub(crate) use startup::run;
