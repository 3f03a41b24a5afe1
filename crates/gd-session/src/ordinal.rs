//! Keyboard addressing of visible links.

use crate::DocumentSession;
use crate::config::OrdinalPlatform;
use crate::interaction::Modifiers;
use gd_document::LinkId;
use gd_ipc::TabMode;

/// Sorted by proximity to F and J.
const HOME_ROW_KEYS: [char; 26] = [
    'f', 'd', 's', 'a', 'j', 'k', 'l', 'r', 'e', 'w', 'q', 'u', 'i', 'o', 'p', 'v', 'c', 'x',
    'z', 'm', 'n', 'g', 'h', 'b', 't', 'y',
];

const DIGIT_KEYS: usize = 9;

/// Which keys label the visible links.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrdinalMode {
    /// `1`-`9`, then the alphabet.
    #[default]
    NumbersAndAlphabet,
    /// Letters ordered by distance from the home row.
    HomeRow,
}

/// Link-key overlay state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct LinkKeys {
    pub(crate) visible: bool,
    pub(crate) mode: OrdinalMode,
    pub(crate) base: usize,
    pub(crate) new_tab: bool,
    pub(crate) hover_only: bool,
}

fn letters(platform: OrdinalPlatform) -> impl Iterator<Item = char> {
    let reserved = platform.reserved_letters();
    ('a'..='z').filter(move |key| !reserved.contains(key))
}

/// Number of ordinals one page of keys can address.
pub fn page_size(mode: OrdinalMode, platform: OrdinalPlatform) -> usize {
    match mode {
        OrdinalMode::NumbersAndAlphabet => DIGIT_KEYS + letters(platform).count(),
        OrdinalMode::HomeRow => HOME_ROW_KEYS.len(),
    }
}

/// Key assigned to page-relative ordinal `ord`.
pub fn ordinal_key(mode: OrdinalMode, platform: OrdinalPlatform, ord: usize) -> Option<char> {
    match mode {
        OrdinalMode::NumbersAndAlphabet if ord < DIGIT_KEYS => {
            char::from_digit(u32::try_from(ord + 1).ok()?, 10)
        }
        OrdinalMode::NumbersAndAlphabet => letters(platform).nth(ord - DIGIT_KEYS),
        OrdinalMode::HomeRow => HOME_ROW_KEYS.get(ord).copied(),
    }
}

/// Page-relative ordinal addressed by `key`.
pub fn ordinal_for_key(mode: OrdinalMode, platform: OrdinalPlatform, key: char) -> Option<usize> {
    match mode {
        OrdinalMode::NumbersAndAlphabet => {
            if let Some(digit) = key.to_digit(10).filter(|digit| *digit >= 1) {
                return usize::try_from(digit - 1).ok();
            }
            letters(platform)
                .position(|letter| letter == key)
                .map(|index| DIGIT_KEYS + index)
        }
        OrdinalMode::HomeRow => HOME_ROW_KEYS.iter().position(|letter| *letter == key),
    }
}

/// Circled glyph drawn next to a link for `key`.
pub fn ordinal_glyph(key: char) -> Option<char> {
    match key {
        '1'..='9' => char::from_u32(0x278a + (key as u32 - '1' as u32)),
        'a'..='z' => char::from_u32(0x24b6 + (key as u32 - 'a' as u32)),
        _ => None,
    }
}

impl DocumentSession {
    /// Position of `link` among the addressable visible links.
    ///
    /// Links whose decoration sits in the top part of the margin are skipped
    /// so that ordinals do not shift while a line is scrolling out of view.
    pub fn visible_link_ordinal(&self, link: LinkId) -> Option<usize> {
        let threshold = self.visible_range().start + self.config.page_margin_px() * 4 / 5;
        self.visible
            .links
            .iter()
            .filter_map(|handle| self.doc.run(*handle))
            .filter(|run| run.bounds.top() >= threshold)
            .filter(|run| run.is_decoration() && run.link_id != 0)
            .position(|run| run.link_id == link)
    }

    pub fn link_numbers_visible(&self) -> bool {
        self.link_keys.visible
    }

    pub fn show_link_numbers(&mut self, mode: OrdinalMode, new_tab: bool, hover_only: bool) {
        self.link_keys = LinkKeys {
            visible: true,
            mode,
            base: 0,
            new_tab,
            hover_only,
        };
        self.invalidate_visible_links();
    }

    /// Moves home-row labels on to the next page of links, wrapping to the
    /// first. Numbered labels do not page.
    pub fn more_link_numbers(&mut self) {
        if !self.link_keys.visible {
            self.show_link_numbers(OrdinalMode::HomeRow, false, false);
            return;
        }
        if self.link_keys.mode != OrdinalMode::HomeRow {
            return;
        }
        let last = self
            .visible
            .links
            .iter()
            .rev()
            .filter_map(|handle| self.doc.run(*handle))
            .find(|run| run.is_decoration() && run.link_id != 0)
            .map(|run| run.link_id);
        let Some(last) = last else {
            self.link_keys.base = 0;
            self.invalidate_visible_links();
            return;
        };
        self.link_keys.base += page_size(self.link_keys.mode, self.config.ordinal_platform);
        if self
            .visible_link_ordinal(last)
            .is_none_or(|ord| ord < self.link_keys.base)
        {
            self.link_keys.base = 0;
        }
        self.invalidate_visible_links();
    }

    pub fn hide_link_numbers(&mut self) {
        if self.link_keys.visible {
            self.link_keys.visible = false;
            self.invalidate_visible_links();
        }
    }

    /// Glyph shown next to `link` while link numbers are visible.
    pub fn link_key_label(&self, link: LinkId) -> Option<char> {
        if !self.link_keys.visible {
            return None;
        }
        let ord = self
            .visible_link_ordinal(link)?
            .checked_sub(self.link_keys.base)?;
        let key = ordinal_key(self.link_keys.mode, self.config.ordinal_platform, ord)?;
        ordinal_glyph(key)
    }

    /// Handles a key press while link numbers are shown.
    pub fn link_key_press(&mut self, key: char, mods: Modifiers) -> bool {
        if !self.link_keys.visible {
            return false;
        }
        let key = key.to_ascii_lowercase();
        let Some(ord) = ordinal_for_key(self.link_keys.mode, self.config.ordinal_platform, key)
        else {
            return false;
        };
        let ord = ord + self.link_keys.base;
        let target = self
            .visible
            .links
            .iter()
            .filter_map(|handle| self.doc.run(*handle))
            .filter(|run| run.is_decoration())
            .map(|run| run.link_id)
            .find(|link| self.visible_link_ordinal(*link) == Some(ord));
        let Some(link) = target else {
            return false;
        };

        if self.link_keys.hover_only {
            let old = self.hover_link;
            self.hover_link = link;
            if old != 0 {
                self.invalidate_link(old);
            }
            self.invalidate_link(link);
        } else {
            let tab = match self.link_keys.mode {
                OrdinalMode::NumbersAndAlphabet => mods.tab_mode(),
                OrdinalMode::HomeRow if self.link_keys.new_tab => TabMode::NewTab,
                OrdinalMode::HomeRow => TabMode::Current,
            };
            self.hide_link_numbers();
            self.open_link_id(link, tab);
            return true;
        }
        self.hide_link_numbers();
        true
    }

    fn invalidate_visible_links(&mut self) {
        let runs = self.visible.links.clone();
        self.invalid.extend(runs);
    }
}

#[cfg(test)]
mod tests {
    use super::OrdinalMode;
    use super::ordinal_for_key;
    use super::ordinal_glyph;
    use super::ordinal_key;
    use super::page_size;
    use crate::config::OrdinalPlatform;
    use proptest::prelude::*;

    #[test]
    fn digits_come_first() {
        let mode = OrdinalMode::NumbersAndAlphabet;
        let platform = OrdinalPlatform::Standard;
        assert_eq!(ordinal_key(mode, platform, 0), Some('1'));
        assert_eq!(ordinal_key(mode, platform, 8), Some('9'));
        assert_eq!(ordinal_key(mode, platform, 9), Some('a'));
        assert_eq!(ordinal_key(mode, platform, 34), Some('z'));
        assert_eq!(ordinal_key(mode, platform, 35), None);
        assert_eq!(ordinal_for_key(mode, platform, '0'), None);
        assert_eq!(page_size(mode, platform), 35);
    }

    #[test]
    fn apple_skips_reserved_letters() {
        let mode = OrdinalMode::NumbersAndAlphabet;
        let platform = OrdinalPlatform::Apple;
        assert_eq!(ordinal_for_key(mode, platform, 'h'), None);
        assert_eq!(ordinal_for_key(mode, platform, 'w'), None);
        assert_eq!(ordinal_for_key(mode, platform, 'i'), Some(9 + 7));
        assert_eq!(ordinal_key(mode, platform, 9 + 7), Some('i'));
        assert_eq!(page_size(mode, platform), 9 + 22);
    }

    #[test]
    fn home_row_order() {
        let mode = OrdinalMode::HomeRow;
        let platform = OrdinalPlatform::Standard;
        assert_eq!(ordinal_key(mode, platform, 0), Some('f'));
        assert_eq!(ordinal_key(mode, platform, 4), Some('j'));
        assert_eq!(ordinal_for_key(mode, platform, 'y'), Some(25));
        assert_eq!(ordinal_for_key(mode, platform, '1'), None);
    }

    #[test]
    fn glyphs_are_circled() {
        assert_eq!(ordinal_glyph('1'), Some('\u{278a}'));
        assert_eq!(ordinal_glyph('a'), Some('\u{24b6}'));
        assert_eq!(ordinal_glyph('z'), Some('\u{24cf}'));
        assert_eq!(ordinal_glyph('!'), None);
    }

    proptest! {
        #[test]
        fn keys_and_ordinals_agree(ord in 0usize..40, apple in any::<bool>(), home in any::<bool>()) {
            let platform = if apple { OrdinalPlatform::Apple } else { OrdinalPlatform::Standard };
            let mode = if home { OrdinalMode::HomeRow } else { OrdinalMode::NumbersAndAlphabet };
            match ordinal_key(mode, platform, ord) {
                Some(key) => prop_assert_eq!(ordinal_for_key(mode, platform, key), Some(ord)),
                None => prop_assert!(ord >= page_size(mode, platform)),
            }
        }
    }
}
