//! Pointer input: hover, selection, link activation and inline players.

use crate::DocumentSession;
use crate::RequestState;
use gd_anim::ClickResult;
use gd_core::Int2;
use gd_core::Rect;
use gd_document::LinkFlags;
use gd_document::LinkId;
use gd_document::MediaFlags;
use gd_document::MediaId;
use gd_document::MediaKind;
use gd_ipc::SessionEvent;
use gd_ipc::TabMode;
use gd_net::url::absolute_url;
use gd_security::BannerKind;
use std::ops::Range;

/// Mouse button as seen by the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
    Back,
    Forward,
}

/// Keyboard modifiers held during an input event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    /// Ctrl, or Command on Apple keyboards.
    pub primary: bool,
}

impl Modifiers {
    /// Where a link opened with these modifiers should go.
    pub fn tab_mode(self) -> TabMode {
        match (self.primary, self.shift) {
            (true, true) => TabMode::NewTab,
            (true, false) => TabMode::Background,
            _ => TabMode::Current,
        }
    }
}

/// Selection anchored where the drag started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Mark {
    pub(crate) anchor: usize,
    pub(crate) end: usize,
}

impl Mark {
    fn at(loc: usize) -> Self {
        Self {
            anchor: loc,
            end: loc,
        }
    }

    pub(crate) fn range(self) -> Range<usize> {
        self.anchor.min(self.end)..self.anchor.max(self.end)
    }
}

impl DocumentSession {
    /// Button press at viewport position `pos`; `clicks` is 2 for a double click.
    pub fn pointer_press(
        &mut self,
        pos: Int2,
        button: PointerButton,
        clicks: u8,
        mods: Modifiers,
    ) -> bool {
        self.last_pointer = Some(pos);
        match button {
            PointerButton::Back => {
                self.navigate_back();
                true
            }
            PointerButton::Forward => {
                self.navigate_forward();
                true
            }
            PointerButton::Middle => {
                if self.hover_link == 0 {
                    return false;
                }
                let tab = if mods.shift {
                    TabMode::NewTab
                } else {
                    TabMode::Background
                };
                self.open_link_id(self.hover_link, tab)
            }
            PointerButton::Secondary => {
                self.context_link = self.hover_link;
                true
            }
            PointerButton::Primary => {
                if self.grabbed_player.is_none() && self.press_media_player(pos, clicks) {
                    return true;
                }
                if self.click.press(pos, clicks) == ClickResult::Started {
                    self.selecting = false;
                    return true;
                }
                false
            }
        }
    }

    /// Viewport rectangle of the volume control of an audio run.
    fn volume_rect(run_rect: Rect) -> Rect {
        let width = run_rect.width() / 4;
        Rect::new(
            run_rect.right() - width,
            run_rect.top(),
            width,
            run_rect.height(),
        )
    }

    fn press_media_player(&mut self, pos: Int2, clicks: u8) -> bool {
        let hit = self
            .visible
            .media
            .iter()
            .filter_map(|handle| self.doc.run(*handle))
            .filter(|run| run.media_kind == MediaKind::Audio)
            .map(|run| (run.media_id, self.viewport_rect(run.bounds)))
            .find(|(_, rect)| rect.contains(pos));
        let Some((id, rect)) = hit else {
            return false;
        };
        let now = self.now();
        let on_volume = Self::volume_rect(rect).contains(pos);
        let Some(player) = self.doc.media_mut().player_mut(id) else {
            return false;
        };
        if on_volume && player.adjusting_volume {
            player.volume_grabbed = true;
            player.last_interaction_ms = now;
            self.grabbed_player = Some((id, player.volume));
            self.click.press(pos, clicks);
        } else if on_volume {
            player.adjusting_volume = true;
            player.last_interaction_ms = now;
        } else {
            player.toggle_pause(now);
        }
        tracing::debug!(media = id, volume = on_volume, "audio player pressed");
        self.invalidate_media(id);
        self.animate_media();
        true
    }

    fn invalidate_media(&mut self, id: MediaId) {
        let runs: Vec<_> = self
            .visible
            .media
            .iter()
            .copied()
            .filter(|handle| self.doc.run(*handle).is_some_and(|run| run.media_id == id))
            .collect();
        self.invalid.extend(runs);
    }

    fn release_grabbed_player(&mut self) -> bool {
        let Some((id, _)) = self.grabbed_player.take() else {
            return false;
        };
        if let Some(player) = self.doc.media_mut().player_mut(id) {
            player.volume_grabbed = false;
        }
        self.invalidate_media(id);
        true
    }

    /// Pointer moved to viewport position `pos`.
    pub fn pointer_motion(&mut self, pos: Int2) {
        self.last_pointer = Some(pos);
        self.no_hover_while_scrolling = false;
        if self.click.motion(pos) != ClickResult::Drag {
            self.update_hover(pos);
            return;
        }
        if let Some((id, start_volume)) = self.grabbed_player {
            let slider = self
                .visible
                .media
                .iter()
                .filter_map(|handle| self.doc.run(*handle))
                .find(|run| run.media_id == id)
                .map(|run| Self::volume_rect(self.viewport_rect(run.bounds)).width())
                .unwrap_or(1)
                .max(1);
            let volume = start_volume + self.click.delta().x as f32 / slider as f32;
            let now = self.now();
            if let Some(player) = self.doc.media_mut().player_mut(id) {
                player.set_volume(volume, now);
            }
            self.invalidate_media(id);
            return;
        }
        if !self.click.is_moved() && !self.selecting {
            return;
        }
        if !self.selecting {
            self.reset_wide_runs();
            self.selecting = true;
            let start = self.document_pos(self.click.start_pos());
            let old = self.select_mark.take();
            if let Some(old) = old {
                self.invalidate_source_range(old.range());
            }
            self.select_mark = self.doc.find_loc(start).map(Mark::at);
        }
        let loc = self.doc.find_loc(self.document_pos(pos));
        let old = self.select_mark;
        if let Some(loc) = loc {
            self.select_mark.get_or_insert(Mark::at(loc)).end = loc;
        }
        if old != self.select_mark {
            if let Some(old) = old {
                self.invalidate_source_range(old.range());
            }
            if let Some(mark) = self.select_mark {
                self.invalidate_source_range(mark.range());
            }
        }
    }

    /// Button released at viewport position `pos`.
    pub fn pointer_release(&mut self, pos: Int2, mods: Modifiers) -> bool {
        self.last_pointer = Some(pos);
        match self.click.release(pos) {
            ClickResult::Finished => {
                if self.release_grabbed_player() {
                    return true;
                }
                if self.click.is_moved() {
                    return true;
                }
                if self.hover_link != 0 {
                    self.activate_link(self.hover_link, mods);
                }
                if let Some(mark) = self.select_mark.take() {
                    self.invalidate_source_range(mark.range());
                }
                self.selecting = false;
                let banner = self
                    .doc
                    .site_banner_rect()
                    .map(|rect| self.viewport_rect(rect));
                if let Some(banner) = banner.filter(|rect| rect.contains(pos)) {
                    let on_warning = self.doc.banner() == BannerKind::CertificateWarning
                        && pos.y - banner.top() > 2 * self.config.line_height;
                    if on_warning {
                        self.show_page_info();
                    } else {
                        self.navigate_root();
                    }
                }
                true
            }
            ClickResult::Aborted | ClickResult::Double => {
                self.release_grabbed_player();
                true
            }
            ClickResult::None | ClickResult::Started | ClickResult::Drag => false,
        }
    }

    /// Follows `link` as a primary click would.
    pub fn activate_link(&mut self, link: LinkId, mods: Modifiers) {
        let flags = self.doc.link_flags(link);
        if flags.is_media_link() {
            if flags.contains(LinkFlags::CONTENT) && flags.contains(LinkFlags::PERMANENT) {
                return;
            }
            if self.request_media(link, true) {
                return;
            }
            if flags.contains(LinkFlags::CONTENT) {
                self.hide_media(link);
            } else {
                self.show_cached_media(link);
            }
            return;
        }
        if flags.contains(LinkFlags::SUPPORTED_PROTOCOL) {
            self.open_link_id(link, mods.tab_mode());
            return;
        }
        if let Some(target) = self.doc.link_url(link) {
            let url = absolute_url(&self.persisted.url, target);
            tracing::info!(%url, "opening link externally");
            self.emit(SessionEvent::OpenExternal { url });
        }
    }

    /// Collapses shown content, cancelling a transfer that is still running.
    fn hide_media(&mut self, link: LinkId) {
        self.doc
            .media_mut()
            .set_data(link, None, &[], MediaFlags::ALLOW_HIDE);
        let unfinished = self
            .media_requests
            .find(link)
            .is_some_and(|item| !item.request.is_finished());
        if unfinished {
            self.cancel_media(link);
        }
        self.redo_layout();
        self.hover_link = 0;
        self.scroll(0);
        self.update_visible();
        self.invalidate();
    }

    /// Shows content fetched earlier again.
    fn show_cached_media(&mut self, link: LinkId) {
        let Some(response) = self
            .media_requests
            .find(link)
            .map(|item| item.request.snapshot())
        else {
            return;
        };
        self.doc.media_mut().set_data(
            link,
            Some(&response.meta),
            &response.body,
            MediaFlags::ALLOW_HIDE,
        );
        self.redo_layout();
        self.update_visible();
        self.invalidate();
    }

    pub(crate) fn open_link_id(&mut self, link: LinkId, tab: TabMode) -> bool {
        let Some(target) = self.doc.link_url(link) else {
            return false;
        };
        let url = absolute_url(&self.persisted.url, target);
        self.open_link(&url, tab);
        true
    }

    /// Announces the navigation and follows it when it stays in this tab.
    pub(crate) fn open_link(&mut self, url: &str, tab: TabMode) {
        tracing::info!(%url, ?tab, "opening link");
        self.emit(SessionEvent::Open {
            url: url.to_owned(),
            tab,
            redirects: 0,
        });
        if tab == TabMode::Current {
            self.set_url(url);
        }
    }

    pub(crate) fn update_hover(&mut self, pos: Int2) {
        let old = self.hover_link;
        self.hover_link = 0;
        let hoverable = matches!(
            self.state,
            RequestState::Ready | RequestState::ReceivedPartial
        );
        if hoverable && !self.no_hover_while_scrolling {
            let doc_pos = self.document_pos(pos);
            let slack = self.config.gap / 2;
            self.hover_link = self
                .visible
                .links
                .iter()
                .filter_map(|handle| self.doc.run(*handle))
                .find(|run| run.bounds.expanded(slack).contains(doc_pos))
                .map_or(0, |run| run.link_id);
        }
        if self.hover_link != old {
            if old != 0 {
                self.invalidate_link(old);
            }
            if self.hover_link != 0 {
                self.invalidate_link(self.hover_link);
            }
        }
    }

    /// Marks every visible run of `link` for redraw.
    pub(crate) fn invalidate_link(&mut self, link: LinkId) {
        let runs: Vec<_> = self
            .visible
            .links
            .iter()
            .copied()
            .filter(|handle| self.doc.run(*handle).is_some_and(|run| run.link_id == link))
            .collect();
        self.invalid.extend(runs);
    }

    /// Marks visible runs overlapping source `range` for redraw.
    pub(crate) fn invalidate_source_range(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let mut runs = Vec::new();
        self.doc.enumerate_runs(self.visible_range(), &mut |handle, run| {
            if run.text.start < range.end && range.start < run.text.end {
                runs.push(handle);
            }
        });
        self.invalid.extend(runs);
    }
}

#[cfg(test)]
mod tests {
    use super::Mark;
    use super::Modifiers;
    use gd_ipc::TabMode;

    #[test]
    fn modifiers_pick_the_tab() {
        assert_eq!(Modifiers::default().tab_mode(), TabMode::Current);
        let primary = Modifiers {
            shift: false,
            primary: true,
        };
        assert_eq!(primary.tab_mode(), TabMode::Background);
        let both = Modifiers {
            shift: true,
            primary: true,
        };
        assert_eq!(both.tab_mode(), TabMode::NewTab);
        let shift_only = Modifiers {
            shift: true,
            primary: false,
        };
        assert_eq!(shift_only.tab_mode(), TabMode::Current);
    }

    #[test]
    fn mark_range_is_ordered() {
        let mark = Mark { anchor: 24, end: 5 };
        assert_eq!(mark.range(), 5..24);
        assert_eq!(Mark::at(7).range(), 7..7);
    }
}
