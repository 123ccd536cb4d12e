use html_escape::encode_text;
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag};

use crate::renderer::Renderer;

/// Grammar options: CommonMark plus the GFM tables, strikethrough and task lists.
fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options
}

/// Parse markdown and emit the document body through `renderer`.
pub fn render_body(markdown: &str, renderer: &mut Renderer<'_>) -> String {
    let parser = Parser::new_ext(markdown, options());
    let mut state = RenderState::default();

    for event in parser {
        process_event(event, &mut state, renderer);
    }

    state.finish()
}

/// An open construct collecting the HTML of its children.
struct Frame {
    kind: FrameKind,
    buf: String,
}

enum FrameKind {
    Paragraph,
    Heading(u8),
    BlockQuote,
    List { ordered: bool },
    Item,
    Table { header: String },
    TableHead,
    TableRow,
    TableCell { header: bool },
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: String, title: Option<String> },
    Image { src: String, title: Option<String>, alt: String },
    CodeBlock { language: Option<String> },
    // Anything we do not style: content passes through.
    Transparent,
}

#[derive(Default)]
struct RenderState {
    // Completed top-level HTML
    out: String,
    // Open constructs, innermost last
    stack: Vec<Frame>,
    in_table_head: bool,
}

impl RenderState {
    fn open(&mut self, kind: FrameKind) {
        self.stack.push(Frame {
            kind,
            buf: String::new(),
        });
    }

    fn push_html(&mut self, html: &str) {
        match self.stack.last_mut() {
            Some(frame) => frame.buf.push_str(html),
            None => self.out.push_str(html),
        }
    }

    /// Innermost image label being collected, if any.
    fn image_alt(&mut self) -> Option<&mut String> {
        self.stack.iter_mut().rev().find_map(|frame| match &mut frame.kind {
            FrameKind::Image { alt, .. } => Some(alt),
            _ => None,
        })
    }

    fn in_code_block(&self) -> bool {
        matches!(
            self.stack.last(),
            Some(Frame {
                kind: FrameKind::CodeBlock { .. },
                ..
            })
        )
    }

    fn finish(mut self) -> String {
        // The parser balances every start tag; flush defensively anyway.
        while let Some(frame) = self.stack.pop() {
            self.push_html(&frame.buf);
        }
        self.out
    }
}

fn process_event(event: Event, state: &mut RenderState, renderer: &mut Renderer<'_>) {
    match event {
        Event::Start(tag) => open_tag(tag, state),
        Event::End(_) => close_tag(state, renderer),

        // Text content
        Event::Text(text) => {
            if state.in_code_block() {
                state.push_html(&text);
            } else if let Some(alt) = state.image_alt() {
                alt.push_str(&text);
            } else {
                let html = renderer.text(&encode_text(&*text));
                state.push_html(&html);
            }
        }

        // Inline code
        Event::Code(code) => {
            if let Some(alt) = state.image_alt() {
                alt.push_str(&code);
            } else {
                let html = renderer.code_span(&code);
                state.push_html(&html);
            }
        }

        // Raw HTML is left to the sanitizer
        Event::Html(html) | Event::InlineHtml(html) => {
            let html = renderer.html(&html);
            state.push_html(&html);
        }

        // Soft breaks stay newlines; hard breaks go through the renderer
        Event::SoftBreak => {
            if let Some(alt) = state.image_alt() {
                alt.push(' ');
            } else {
                state.push_html("\n");
            }
        }
        Event::HardBreak => {
            let html = renderer.line_break();
            state.push_html(&html);
        }

        Event::Rule => {
            let html = renderer.rule();
            state.push_html(&html);
        }

        // Task list checkboxes
        Event::TaskListMarker(checked) => {
            let html = renderer.task_marker(checked);
            state.push_html(&html);
        }

        // Extensions we do not enable still degrade to literal text
        Event::FootnoteReference(text) | Event::InlineMath(text) | Event::DisplayMath(text) => {
            state.push_html(&encode_text(&*text));
        }
    }
}

fn open_tag(tag: Tag, state: &mut RenderState) {
    let kind = match tag {
        Tag::Paragraph => FrameKind::Paragraph,
        Tag::Heading { level, .. } => FrameKind::Heading(heading_level_to_u8(level)),
        Tag::BlockQuote(_) => FrameKind::BlockQuote,
        Tag::CodeBlock(kind) => FrameKind::CodeBlock {
            language: match kind {
                CodeBlockKind::Fenced(info) => info.split_whitespace().next().map(str::to_string),
                CodeBlockKind::Indented => None,
            },
        },
        Tag::List(first_item) => FrameKind::List {
            ordered: first_item.is_some(),
        },
        Tag::Item => FrameKind::Item,
        Tag::Table(_) => FrameKind::Table {
            header: String::new(),
        },
        Tag::TableHead => {
            state.in_table_head = true;
            FrameKind::TableHead
        }
        Tag::TableRow => FrameKind::TableRow,
        Tag::TableCell => FrameKind::TableCell {
            header: state.in_table_head,
        },
        Tag::Emphasis => FrameKind::Emphasis,
        Tag::Strong => FrameKind::Strong,
        Tag::Strikethrough => FrameKind::Strikethrough,
        Tag::Link {
            dest_url, title, ..
        } => FrameKind::Link {
            href: dest_url.into_string(),
            title: non_empty(title.into_string()),
        },
        Tag::Image {
            dest_url, title, ..
        } => FrameKind::Image {
            src: dest_url.into_string(),
            title: non_empty(title.into_string()),
            alt: String::new(),
        },
        _ => FrameKind::Transparent,
    };
    state.open(kind);
}

fn close_tag(state: &mut RenderState, renderer: &mut Renderer<'_>) {
    let Some(Frame { kind, buf }) = state.stack.pop() else {
        return;
    };

    let html = match kind {
        FrameKind::Paragraph => renderer.paragraph(&buf),
        FrameKind::Heading(level) => renderer.heading(level, &buf),
        FrameKind::BlockQuote => renderer.blockquote(&buf),
        FrameKind::List { ordered } => renderer.list(&buf, ordered),
        FrameKind::Item => renderer.list_item(&buf),
        FrameKind::Table { header } => renderer.table(&header, &buf),
        FrameKind::TableHead => {
            state.in_table_head = false;
            let row = renderer.table_row(&buf);
            if let Some(Frame {
                kind: FrameKind::Table { header },
                ..
            }) = state.stack.last_mut()
            {
                *header = row;
            }
            return;
        }
        FrameKind::TableRow => renderer.table_row(&buf),
        FrameKind::TableCell { header } => renderer.table_cell(&buf, header),
        FrameKind::Emphasis => renderer.emphasis(&buf),
        FrameKind::Strong => renderer.strong(&buf),
        FrameKind::Strikethrough => renderer.strikethrough(&buf),
        FrameKind::Link { href, title } => {
            // Its text already went into the image label
            if state.image_alt().is_some() {
                return;
            }
            renderer.link(&href, title.as_deref(), &buf)
        }
        FrameKind::Image { src, title, alt } => {
            // An image nested in another image's label only contributes text
            if let Some(outer) = state.image_alt() {
                outer.push_str(&alt);
                return;
            }
            renderer.image(&src, title.as_deref(), &alt)
        }
        FrameKind::CodeBlock { language } => renderer.code_block(&buf, language.as_deref()),
        FrameKind::Transparent => buf,
    };
    state.push_html(&html);
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}

fn heading_level_to_u8(level: HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
