//! Fixed-pitch line layout of gemtext and plain text sources.

use crate::Document;
use crate::SourceFormat;
use crate::media::MediaStore;
use crate::run::Heading;
use crate::run::Link;
use crate::run::LinkFlags;
use crate::run::LinkId;
use crate::run::MediaKind;
use crate::run::PreId;
use crate::run::Run;
use crate::run::RunFlags;
use crate::run::RunHandle;
use gd_core::Int2;
use gd_core::RangeI;
use gd_core::Rect;
use gd_net::GemUrl;
use gd_net::url::absolute_url;
use gd_net::url::is_supported_scheme;
use gd_net::url::scheme_of;
use gd_security::BannerKind;
use std::ops::Range;

const LINK_INDENT_CHARS: i32 = 3;
const AUDIO_ROWS: i32 = 2;
const DOWNLOAD_ROWS: i32 = 2;
const IMAGE_PLACEHOLDER_ROWS: i32 = 4;

/// Cell metrics of the fixed-pitch layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutMetrics {
    pub char_width: i32,
    pub line_height: i32,
    pub gap: i32,
}

impl Default for LayoutMetrics {
    fn default() -> Self {
        Self {
            char_width: 9,
            line_height: 20,
            gap: 6,
        }
    }
}

/// Line-oriented document: one run per wrapped line segment, a decoration
/// run in front of every link, and a media run below links showing content.
#[derive(Debug, Clone)]
pub struct LineDocument {
    metrics: LayoutMetrics,
    url: String,
    format: SourceFormat,
    banner: BannerKind,
    source: String,
    width: i32,
    generation: u32,
    runs: Vec<Run>,
    links: Vec<Link>,
    headings: Vec<Heading>,
    pre_widths: Vec<i32>,
    size: Int2,
    media: MediaStore,
}

impl LineDocument {
    pub fn new(metrics: LayoutMetrics) -> Self {
        Self {
            metrics,
            url: String::new(),
            format: SourceFormat::Gemini,
            banner: BannerKind::None,
            source: String::new(),
            width: 0,
            generation: 0,
            runs: Vec::new(),
            links: Vec::new(),
            headings: Vec::new(),
            pre_widths: Vec::new(),
            size: Int2::default(),
            media: MediaStore::default(),
        }
    }

    pub fn metrics(&self) -> LayoutMetrics {
        self.metrics
    }

    fn handle(&self, index: usize) -> RunHandle {
        RunHandle {
            generation: self.generation,
            index: u32::try_from(index).unwrap_or(u32::MAX),
        }
    }

    fn index_of(&self, handle: RunHandle) -> Option<usize> {
        if handle.generation != self.generation {
            return None;
        }
        let index = usize::try_from(handle.index).ok()?;
        (index < self.runs.len()).then_some(index)
    }

    fn banner_height(&self) -> i32 {
        match self.banner {
            BannerKind::None => 0,
            BannerKind::SiteDomain => 2 * self.metrics.line_height,
            BannerKind::CertificateWarning => 4 * self.metrics.line_height,
        }
    }

    fn layout(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.runs.clear();
        self.links.clear();
        self.headings.clear();
        self.pre_widths.clear();

        let width = self.width.max(self.metrics.char_width);
        let mut builder = Builder {
            metrics: self.metrics,
            width,
            y: 0,
            runs: Vec::new(),
        };

        if self.banner != BannerKind::None {
            let height = self.banner_height();
            builder.runs.push(Run {
                bounds: Rect::new(0, 0, width, height),
                visual_width: width,
                text: 0..0,
                label: Some(self.banner_label()),
                link_id: 0,
                media_id: 0,
                media_kind: MediaKind::None,
                pre_id: 0,
                flags: RunFlags::DECORATION.union(RunFlags::SITE_BANNER),
            });
            builder.y = height;
        }

        let source = std::mem::take(&mut self.source);
        let mut pre_id: PreId = 0;
        let mut in_pre = false;
        let mut offset = 0_usize;
        for raw in source.split_inclusive('\n') {
            let start = offset;
            offset += raw.len();
            let line = raw.trim_end_matches(['\n', '\r']);
            let end = start + line.len();

            if self.format == SourceFormat::PlainText {
                builder.text_lines(&source, start..end, 0, 0, 0);
                continue;
            }
            if line.starts_with("```") {
                in_pre = !in_pre;
                if in_pre {
                    pre_id = pre_id.saturating_add(1);
                    self.pre_widths.push(0);
                }
                continue;
            }
            if in_pre {
                let visual = builder.preformatted(start..end, line, pre_id);
                if let Some(max) = self.pre_widths.last_mut() {
                    *max = (*max).max(visual);
                }
                continue;
            }
            if line.trim().is_empty() {
                builder.y += self.metrics.line_height;
                continue;
            }
            if let Some(rest) = line.strip_prefix("=>") {
                self.layout_link(&mut builder, &source, start + 2, rest);
                continue;
            }
            let hashes = line.bytes().take_while(|byte| *byte == b'#').count();
            if (1..=3).contains(&hashes) {
                let text = trimmed_range(line, hashes, start);
                self.headings.push(Heading {
                    level: u8::try_from(hashes - 1).unwrap_or(0),
                    text: text.clone(),
                    top: builder.y,
                });
                builder.text_lines(&source, text, 0, 0, 0);
                continue;
            }
            builder.text_lines(&source, start..end, 0, 0, 0);
        }

        self.source = source;

        for run in &mut builder.runs {
            if run.pre_id == 0 {
                continue;
            }
            let index = usize::from(run.pre_id) - 1;
            if self.pre_widths.get(index).is_some_and(|max| *max > width) {
                run.flags.insert(RunFlags::WIDE);
            }
        }

        self.size = Int2::new(width, builder.y);
        self.runs = builder.runs;
        tracing::trace!(
            generation = self.generation,
            runs = self.runs.len(),
            height = self.size.y,
            "document laid out"
        );
    }

    fn layout_link(&mut self, builder: &mut Builder, source: &str, base: usize, rest: &str) {
        let url_start = rest.len() - rest.trim_start().len();
        let after_url = rest[url_start..]
            .find(char::is_whitespace)
            .map_or(rest.len(), |index| url_start + index);
        let target = &rest[url_start..after_url];
        let label = trimmed_range(rest, after_url, base);
        let label = if label.is_empty() {
            base + url_start..base + after_url
        } else {
            label
        };

        let url = absolute_url(&self.url, target);
        let flags = static_link_flags(&self.url, &url);
        self.links.push(Link {
            url,
            flags,
        });
        let link_id = LinkId::try_from(self.links.len()).unwrap_or(LinkId::MAX);
        let icon = if flags.contains(LinkFlags::IMAGE_EXT) {
            "\u{1f5bc}"
        } else if flags.contains(LinkFlags::AUDIO_EXT) {
            "\u{1f3b5}"
        } else {
            "\u{27a4}"
        };

        let line_height = self.metrics.line_height;
        let char_width = self.metrics.char_width;
        builder.runs.push(Run {
            bounds: Rect::new(0, builder.y, 2 * char_width, line_height),
            visual_width: 2 * char_width,
            text: label.start..label.start,
            label: Some(icon.to_owned()),
            link_id,
            media_id: 0,
            media_kind: MediaKind::None,
            pre_id: 0,
            flags: RunFlags::DECORATION,
        });
        builder.text_lines(&source, label, LINK_INDENT_CHARS * char_width, link_id, 0);

        let Some(media_id) = self.media.find_for_link(link_id) else {
            return;
        };
        let Some(info) = self.media.info(media_id) else {
            return;
        };
        let height = match info.kind {
            MediaKind::Image => match info.size {
                Some(size) if size.x > 0 => {
                    let shown = size.x.min(builder.width);
                    (i64::from(size.y) * i64::from(shown) / i64::from(size.x)) as i32
                }
                _ => IMAGE_PLACEHOLDER_ROWS * line_height,
            },
            MediaKind::Audio => AUDIO_ROWS * line_height,
            MediaKind::Download => DOWNLOAD_ROWS * line_height,
            MediaKind::None => return,
        };
        let shown_width = match (info.kind, info.size) {
            (MediaKind::Image, Some(size)) if size.x > 0 => size.x.min(builder.width),
            _ => builder.width,
        };
        builder.runs.push(Run {
            bounds: Rect::new(0, builder.y, shown_width, height),
            visual_width: shown_width,
            text: label_end(&builder.runs),
            label: None,
            link_id,
            media_id,
            media_kind: info.kind,
            pre_id: 0,
            flags: RunFlags::empty(),
        });
        builder.y += height + self.metrics.gap;
    }

    fn banner_label(&self) -> String {
        let host = GemUrl::parse(&self.url)
            .map(|url| url.host().to_owned())
            .unwrap_or_default();
        let host = if host.is_empty() {
            "Local file".to_owned()
        } else {
            host
        };
        match self.banner {
            BannerKind::CertificateWarning => {
                format!("{host}\n\u{26a0} Certificate issue: the server's identity is not trusted")
            }
            _ => host,
        }
    }
}

fn label_end(runs: &[Run]) -> Range<usize> {
    let end = runs.last().map_or(0, |run| run.text.end);
    end..end
}

fn trimmed_range(line: &str, skip: usize, base: usize) -> Range<usize> {
    let rest = &line[skip..];
    let leading = rest.len() - rest.trim_start().len();
    let trimmed = rest.trim();
    let start = base + skip + leading;
    start..start + trimmed.len()
}

fn static_link_flags(base: &str, url: &str) -> LinkFlags {
    let mut flags = LinkFlags::empty();
    let scheme = scheme_of(url);
    if is_supported_scheme(&scheme) {
        flags.insert(LinkFlags::SUPPORTED_PROTOCOL);
    }
    if scheme != "about" && scheme != "file" && scheme_of(base) != scheme {
        flags.insert(LinkFlags::REMOTE);
    }
    if let Some(ext) = GemUrl::parse(url).ok().and_then(|url| url.extension()) {
        match ext.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" => flags.insert(LinkFlags::IMAGE_EXT),
            "mp3" | "ogg" | "wav" | "mid" | "flac" => flags.insert(LinkFlags::AUDIO_EXT),
            _ => {}
        }
    }
    flags
}

struct Builder {
    metrics: LayoutMetrics,
    width: i32,
    y: i32,
    runs: Vec<Run>,
}

impl Builder {
    /// Wrapped text starting at `indent`; an empty range still takes a row.
    fn text_lines(
        &mut self,
        source: &str,
        range: Range<usize>,
        indent: i32,
        link_id: LinkId,
        pre_id: PreId,
    ) {
        let char_width = self.metrics.char_width.max(1);
        let max_chars = usize::try_from(((self.width - indent) / char_width).max(1)).unwrap_or(1);
        let text = &source[range.clone()];
        if text.is_empty() {
            self.y += self.metrics.line_height;
            return;
        }
        for (segment, chars) in wrap(text, range.start, max_chars) {
            let visual = i32::try_from(chars).unwrap_or(i32::MAX / 2) * char_width;
            self.runs.push(Run {
                bounds: Rect::new(indent, self.y, visual, self.metrics.line_height),
                visual_width: visual,
                text: segment,
                label: None,
                link_id,
                media_id: 0,
                media_kind: MediaKind::None,
                pre_id,
                flags: RunFlags::empty(),
            });
            self.y += self.metrics.line_height;
        }
    }

    /// Unwrapped line of a preformatted block; returns its visual width.
    fn preformatted(&mut self, range: Range<usize>, line: &str, pre_id: PreId) -> i32 {
        let chars = i32::try_from(line.chars().count()).unwrap_or(i32::MAX / 2);
        let visual = chars.saturating_mul(self.metrics.char_width);
        if !line.is_empty() {
            self.runs.push(Run {
                bounds: Rect::new(0, self.y, visual, self.metrics.line_height),
                visual_width: visual,
                text: range,
                label: None,
                link_id: 0,
                media_id: 0,
                media_kind: MediaKind::None,
                pre_id,
                flags: RunFlags::empty(),
            });
        }
        self.y += self.metrics.line_height;
        visual
    }
}

/// Splits `text` into segments of at most `max_chars`, preferring to break
/// at whitespace. Returns byte ranges offset by `base` and char counts.
fn wrap(text: &str, base: usize, max_chars: usize) -> Vec<(Range<usize>, usize)> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    let mut out = Vec::new();
    let mut start = 0_usize;
    while start < chars.len() {
        let mut end = start + (chars.len() - start).min(max_chars);
        if end < chars.len() && !chars[end].1.is_whitespace() {
            if let Some(space) = (start + 1..end).rev().find(|&index| chars[index].1.is_whitespace()) {
                end = space;
            }
        }
        let byte_start = chars[start].0;
        let byte_end = chars.get(end).map_or(text.len(), |(offset, _)| *offset);
        out.push((base + byte_start..base + byte_end, end - start));
        start = end;
        while start < chars.len() && chars[start].1.is_whitespace() {
            start += 1;
        }
    }
    out
}

fn char_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(offset, _)| offset)
}

impl Document for LineDocument {
    fn generation(&self) -> u32 {
        self.generation
    }

    fn reset(&mut self) {
        self.source.clear();
        self.media.clear();
        self.layout();
    }

    fn set_url(&mut self, url: &str) {
        self.url = url.to_owned();
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn set_format(&mut self, format: SourceFormat) {
        self.format = format;
    }

    fn format(&self) -> SourceFormat {
        self.format
    }

    fn set_banner(&mut self, banner: BannerKind) {
        self.banner = banner;
    }

    fn banner(&self) -> BannerKind {
        self.banner
    }

    fn set_source(&mut self, source: &str, width: i32) {
        self.source = source.to_owned();
        self.width = width;
        self.layout();
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn set_width(&mut self, width: i32) {
        self.width = width;
        self.layout();
    }

    fn redo_layout(&mut self) {
        self.layout();
    }

    fn size(&self) -> Int2 {
        self.size
    }

    fn run(&self, handle: RunHandle) -> Option<&Run> {
        self.index_of(handle).map(|index| &self.runs[index])
    }

    fn run_text(&self, handle: RunHandle) -> Option<&str> {
        let run = self.run(handle)?;
        if let Some(label) = &run.label {
            return Some(label.as_str());
        }
        self.source.get(run.text.clone())
    }

    fn enumerate_runs(&self, range: RangeI, visitor: &mut dyn FnMut(RunHandle, &Run)) {
        for (index, run) in self.runs.iter().enumerate() {
            if run.bounds.top() >= range.end {
                break;
            }
            if run.bounds.bottom() > range.start {
                visitor(self.handle(index), run);
            }
        }
    }

    fn find_run_at(&self, pos: Int2) -> Option<RunHandle> {
        self.runs
            .iter()
            .position(|run| run.bounds.contains(pos))
            .map(|index| self.handle(index))
    }

    fn find_loc(&self, pos: Int2) -> Option<usize> {
        let char_width = self.metrics.char_width.max(1);
        let mut best = None;
        for run in &self.runs {
            if run.is_decoration() || run.text.is_empty() || run.media_id != 0 {
                continue;
            }
            if run.bounds.top() > pos.y {
                return best.or(Some(run.text.start));
            }
            if pos.y >= run.bounds.bottom() {
                best = Some(run.text.end);
                continue;
            }
            if pos.x < run.bounds.left() {
                return Some(run.text.start);
            }
            if pos.x < run.bounds.right() {
                let chars = usize::try_from((pos.x - run.bounds.left()) / char_width).unwrap_or(0);
                let text = &self.source[run.text.clone()];
                return Some(run.text.start + char_offset(text, chars));
            }
            best = Some(run.text.end);
        }
        best
    }

    fn find_run_at_source(&self, offset: usize) -> Option<RunHandle> {
        self.runs
            .iter()
            .position(|run| {
                !run.is_decoration()
                    && run.media_id == 0
                    && run.text.start <= offset
                    && offset < run.text.end
            })
            .map(|index| self.handle(index))
    }

    fn headings(&self) -> &[Heading] {
        &self.headings
    }

    fn link_count(&self) -> LinkId {
        LinkId::try_from(self.links.len()).unwrap_or(LinkId::MAX)
    }

    fn link_url(&self, link: LinkId) -> Option<&str> {
        let index = usize::from(link).checked_sub(1)?;
        self.links.get(index).map(|link| link.url.as_str())
    }

    fn link_flags(&self, link: LinkId) -> LinkFlags {
        let Some(index) = usize::from(link).checked_sub(1) else {
            return LinkFlags::empty();
        };
        let Some(entry) = self.links.get(index) else {
            return LinkFlags::empty();
        };
        let mut flags = entry.flags;
        let shown = self
            .media
            .find_for_link(link)
            .and_then(|id| self.media.info(id));
        if let Some(info) = shown {
            if matches!(info.kind, MediaKind::Image | MediaKind::Audio) {
                flags.insert(LinkFlags::CONTENT);
                if !info.allow_hide {
                    flags.insert(LinkFlags::PERMANENT);
                }
            }
        }
        flags
    }

    fn link_runs(&self, link: LinkId) -> Vec<RunHandle> {
        self.runs
            .iter()
            .enumerate()
            .filter(|(_, run)| run.link_id == link)
            .map(|(index, _)| self.handle(index))
            .collect()
    }

    fn pre_runs(&self, pre: PreId) -> Vec<RunHandle> {
        self.runs
            .iter()
            .enumerate()
            .filter(|(_, run)| run.pre_id == pre)
            .map(|(index, _)| self.handle(index))
            .collect()
    }

    fn pre_width(&self, pre: PreId) -> i32 {
        usize::from(pre)
            .checked_sub(1)
            .and_then(|index| self.pre_widths.get(index))
            .copied()
            .unwrap_or(0)
    }

    fn site_banner_rect(&self) -> Option<Rect> {
        self.runs
            .first()
            .filter(|run| run.flags.contains(RunFlags::SITE_BANNER))
            .map(|run| run.bounds)
    }

    fn title(&self) -> Option<String> {
        let heading = self.headings.iter().find(|heading| heading.level == 0)?;
        Some(self.source[heading.text.clone()].to_owned())
    }

    fn media(&self) -> &MediaStore {
        &self.media
    }

    fn media_mut(&mut self) -> &mut MediaStore {
        &mut self.media
    }
}

#[cfg(test)]
mod tests {
    use super::LayoutMetrics;
    use super::LineDocument;
    use super::wrap;
    use crate::Document;
    use crate::SourceFormat;
    use crate::media::MediaFlags;
    use crate::run::LinkFlags;
    use crate::run::MediaKind;
    use crate::run::RunHandle;
    use gd_core::Int2;
    use gd_core::RangeI;
    use gd_security::BannerKind;

    fn metrics() -> LayoutMetrics {
        LayoutMetrics {
            char_width: 10,
            line_height: 20,
            gap: 6,
        }
    }

    fn doc(source: &str, width: i32) -> LineDocument {
        let mut doc = LineDocument::new(metrics());
        doc.set_url("gemini://example/dir/page.gmi");
        doc.set_source(source, width);
        doc
    }

    fn all_runs(doc: &LineDocument) -> Vec<(RunHandle, crate::run::Run)> {
        let mut out = Vec::new();
        doc.enumerate_runs(RangeI::new(0, doc.size().y), &mut |handle, run| {
            out.push((handle, run.clone()));
        });
        out
    }

    #[test]
    fn heading_and_paragraph_layout() {
        let doc = doc("# Hi\nSome text\n", 400);
        assert_eq!(doc.size(), Int2::new(400, 40));
        assert_eq!(doc.headings().len(), 1);
        assert_eq!(doc.title().as_deref(), Some("Hi"));
        let runs = all_runs(&doc);
        assert_eq!(runs.len(), 2);
        assert_eq!(doc.run_text(runs[0].0), Some("Hi"));
        assert_eq!(runs[1].1.bounds.top(), 20);
    }

    #[test]
    fn wrap_prefers_whitespace() {
        let segments = wrap("aaa bbb ccc", 0, 5);
        let ranges: Vec<_> = segments.iter().map(|(range, _)| range.clone()).collect();
        assert_eq!(ranges, vec![0..3, 4..7, 8..11]);
        let forced = wrap("abcdefgh", 10, 3);
        assert_eq!(forced[0], (10..13, 3));
        assert_eq!(forced.len(), 3);
    }

    #[test]
    fn links_get_decoration_and_absolute_urls() {
        let doc = doc("=> pic.png A picture\n=> https://other/ Away\n", 400);
        assert_eq!(doc.link_count(), 2);
        assert_eq!(doc.link_url(1), Some("gemini://example/dir/pic.png"));
        let flags = doc.link_flags(1);
        assert!(flags.contains(LinkFlags::SUPPORTED_PROTOCOL));
        assert!(flags.contains(LinkFlags::IMAGE_EXT));
        assert!(!doc.link_flags(2).contains(LinkFlags::SUPPORTED_PROTOCOL));

        let runs = all_runs(&doc);
        assert!(runs[0].1.is_decoration());
        assert_eq!(runs[0].1.link_id, 1);
        assert_eq!(doc.run_text(runs[1].0), Some("A picture"));
        assert_eq!(doc.link_runs(2).len(), 2);
    }

    #[test]
    fn link_without_label_shows_url() {
        let doc = doc("=> gemini://example/x\n", 400);
        let runs = all_runs(&doc);
        assert_eq!(doc.run_text(runs[1].0), Some("gemini://example/x"));
    }

    #[test]
    fn wide_preformatted_blocks_are_flagged() {
        let doc = doc("```\nshort\n0123456789012345678901234\n```\n```\nok\n```\n", 100);
        assert_eq!(doc.pre_width(1), 250);
        assert_eq!(doc.pre_width(2), 20);
        let runs = all_runs(&doc);
        assert!(runs.iter().filter(|(_, run)| run.pre_id == 1).all(|(_, run)| run.is_wide()));
        assert!(runs.iter().filter(|(_, run)| run.pre_id == 2).all(|(_, run)| !run.is_wide()));
        assert_eq!(doc.pre_runs(1).len(), 2);
    }

    #[test]
    fn relayout_invalidates_old_handles() {
        let mut doc = doc("text\n", 400);
        let handle = doc.find_run_at(Int2::new(5, 5)).unwrap_or_else(|| unreachable!());
        assert!(doc.run(handle).is_some());
        doc.redo_layout();
        assert!(doc.run(handle).is_none());
    }

    #[test]
    fn media_run_follows_link_and_sets_content_flag() {
        let mut doc = doc("=> song.ogg Song\nafter\n", 400);
        doc.media_mut()
            .set_data(1, Some("audio/ogg"), b"OggS", MediaFlags::ALLOW_HIDE);
        doc.redo_layout();
        let runs = all_runs(&doc);
        let media = runs
            .iter()
            .find(|(_, run)| run.media_kind == MediaKind::Audio)
            .unwrap_or_else(|| unreachable!());
        assert_eq!(media.1.link_id, 1);
        assert_eq!(media.1.bounds.height(), 40);
        let flags = doc.link_flags(1);
        assert!(flags.contains(LinkFlags::CONTENT));
        assert!(!flags.contains(LinkFlags::PERMANENT));
    }

    #[test]
    fn banner_occupies_the_top() {
        let mut doc = LineDocument::new(metrics());
        doc.set_url("gemini://example.org/");
        doc.set_banner(BannerKind::CertificateWarning);
        doc.set_source("line\n", 300);
        let banner = doc.site_banner_rect().unwrap_or_else(|| unreachable!());
        assert_eq!(banner.height(), 80);
        assert_eq!(doc.size().y, 100);
    }

    #[test]
    fn locations_map_back_to_source() {
        let doc = doc("abcdef\nghij\n", 400);
        assert_eq!(doc.find_loc(Int2::new(25, 5)), Some(2));
        assert_eq!(doc.find_loc(Int2::new(300, 5)), Some(6));
        assert_eq!(doc.find_loc(Int2::new(15, 25)), Some(8));
        assert_eq!(doc.find_loc(Int2::new(0, 500)), Some(11));
        let run = doc.find_run_at_source(9).unwrap_or_else(|| unreachable!());
        assert_eq!(doc.run(run).map(|run| run.bounds.top()), Some(20));
    }

    #[test]
    fn plain_text_ignores_markup() {
        let mut doc = LineDocument::new(metrics());
        doc.set_format(SourceFormat::PlainText);
        doc.set_source("# not a heading\n=> not a link\n", 400);
        assert!(doc.headings().is_empty());
        assert_eq!(doc.link_count(), 0);
    }
}
