use crate::codec::read_string_u16;
use crate::codec::read_u16;
use crate::codec::write_string_u16;
use crate::codec::write_u16;
use crate::history::History;
use gd_core::BrowserResult;

/// Debug text that older builds leaked into saved URLs.
pub const CORRUPT_URL_MARKER: &str = " ptr:0x";

const RELOAD_MASK: u16 = 0x7;

/// How often an open page is refetched automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ReloadInterval {
    #[default]
    Never,
    Minute,
    FiveMinutes,
    FifteenMinutes,
    Hour,
    FourHours,
    TwelveHours,
    Day,
}

impl ReloadInterval {
    pub const ALL: [Self; 8] = [
        Self::Never,
        Self::Minute,
        Self::FiveMinutes,
        Self::FifteenMinutes,
        Self::Hour,
        Self::FourHours,
        Self::TwelveHours,
        Self::Day,
    ];

    pub fn minutes(self) -> u32 {
        match self {
            Self::Never => 0,
            Self::Minute => 1,
            Self::FiveMinutes => 5,
            Self::FifteenMinutes => 15,
            Self::Hour => 60,
            Self::FourHours => 4 * 60,
            Self::TwelveHours => 12 * 60,
            Self::Day => 24 * 60,
        }
    }

    pub fn seconds(self) -> u64 {
        u64::from(self.minutes()) * 60
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Never => "Never",
            Self::Minute => "1 minute",
            Self::FiveMinutes => "5 minutes",
            Self::FifteenMinutes => "15 minutes",
            Self::Hour => "1 hour",
            Self::FourHours => "4 hours",
            Self::TwelveHours => "12 hours",
            Self::Day => "Once per day",
        }
    }

    pub fn bits(self) -> u16 {
        match self {
            Self::Never => 0,
            Self::Minute => 1,
            Self::FiveMinutes => 2,
            Self::FifteenMinutes => 3,
            Self::Hour => 4,
            Self::FourHours => 5,
            Self::TwelveHours => 6,
            Self::Day => 7,
        }
    }

    /// Decodes the low three bits; higher bits are ignored.
    pub fn from_bits(bits: u16) -> Self {
        Self::ALL[usize::from(bits & RELOAD_MASK)]
    }
}

/// What a tab writes to disk between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistedSession {
    pub url: String,
    pub reload_interval: ReloadInterval,
    pub history: History,
}

impl PersistedSession {
    pub fn encode(&self) -> BrowserResult<Vec<u8>> {
        let mut out = Vec::new();
        write_string_u16(&mut out, &self.url, "session.url")?;
        write_u16(&mut out, self.reload_interval.bits());
        out.extend_from_slice(&self.history.serialize()?);
        Ok(out)
    }

    pub fn decode(payload: &[u8]) -> BrowserResult<Self> {
        let mut offset = 0_usize;
        let mut url = read_string_u16(payload, &mut offset, "session.url")?;
        if url.contains(CORRUPT_URL_MARKER) {
            tracing::warn!(%url, "discarding corrupt saved url");
            url.clear();
        }
        let flags = read_u16(payload, &mut offset, "session.flags")?;
        let history = History::deserialize(payload, &mut offset)?;
        Ok(Self {
            url,
            reload_interval: ReloadInterval::from_bits(flags),
            history,
        })
    }
}
