//! Periodic refresh while inline players or downloads are on screen.

use crate::DocumentSession;
use gd_document::MediaKind;

const PLAYER_INTERVAL_MS: u64 = 1000 / 15;
const DOWNLOAD_INTERVAL_MS: u64 = 1000;
const VOLUME_IDLE_MS: u64 = 3000;

/// Repeating timer polled from the frame loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MediaTicker {
    interval_ms: u64,
    due_ms: Option<u64>,
}

impl MediaTicker {
    pub(crate) fn is_running(&self) -> bool {
        self.due_ms.is_some()
    }

    pub(crate) fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub(crate) fn start(&mut self, interval_ms: u64, now: u64) {
        self.interval_ms = interval_ms;
        self.due_ms = Some(now.saturating_add(interval_ms));
    }

    pub(crate) fn stop(&mut self) {
        self.due_ms = None;
    }

    /// Whether the timer fired since the last poll; rearms itself when it did.
    pub(crate) fn poll(&mut self, now: u64) -> bool {
        match self.due_ms {
            Some(due) if now >= due => {
                self.due_ms = Some(now.saturating_add(self.interval_ms));
                true
            }
            _ => false,
        }
    }
}

impl DocumentSession {
    /// Refresh period wanted by the visible media; 0 when nothing needs it.
    pub(crate) fn media_update_interval(&self) -> u64 {
        let mut interval = u64::MAX;
        for run in self.visible.media.iter().filter_map(|handle| self.doc.run(*handle)) {
            match run.media_kind {
                MediaKind::Audio => {
                    let active = self
                        .doc
                        .media()
                        .player(run.media_id)
                        .is_some_and(|player| player.adjusting_volume || player.is_playing());
                    if active {
                        interval = interval.min(PLAYER_INTERVAL_MS);
                    }
                }
                MediaKind::Download => interval = interval.min(DOWNLOAD_INTERVAL_MS),
                MediaKind::None | MediaKind::Image => {}
            }
        }
        if interval == u64::MAX { 0 } else { interval }
    }

    /// Runs the ticker at the period the visible media wants, or stops it.
    pub(crate) fn animate_media(&mut self) {
        let interval = self.media_update_interval();
        if interval == 0 {
            if self.ticker.is_running() {
                self.ticker.stop();
                tracing::trace!("media ticker stopped");
            }
        } else if !self.ticker.is_running() || self.ticker.interval_ms() != interval {
            let now = self.now();
            self.ticker.start(interval, now);
            tracing::trace!(interval, "media ticker started");
        }
    }

    pub(crate) fn update_media(&mut self) {
        let now = self.now();
        let media: Vec<_> = self
            .visible
            .media
            .iter()
            .filter_map(|handle| self.doc.run(*handle))
            .filter(|run| run.media_kind == MediaKind::Audio)
            .map(|run| run.media_id)
            .collect();
        for id in media {
            if let Some(player) = self.doc.media_mut().player_mut(id) {
                if player.adjusting_volume
                    && !player.volume_grabbed
                    && player.idle_ms(now) > VOLUME_IDLE_MS
                {
                    player.adjusting_volume = false;
                }
            }
        }
        let runs = self.visible.media.clone();
        self.invalid.extend(runs);
        self.animate_media();
    }

    /// Period of the running media ticker.
    pub fn media_ticker_interval(&self) -> Option<u64> {
        self.ticker
            .is_running()
            .then_some(self.ticker.interval_ms())
    }
}

#[cfg(test)]
mod tests {
    use super::MediaTicker;

    #[test]
    fn ticker_fires_and_rearms() {
        let mut ticker = MediaTicker::default();
        assert!(!ticker.poll(1000));
        ticker.start(66, 0);
        assert!(!ticker.poll(65));
        assert!(ticker.poll(66));
        assert!(!ticker.poll(100));
        assert!(ticker.poll(132));
        ticker.stop();
        assert!(!ticker.is_running());
        assert!(!ticker.poll(10_000));
    }
}
