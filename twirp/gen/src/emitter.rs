//! Ordered, append-only sink for the text of one generated file.
//!
//! Code is appended as token streams (one item group per call), banners as
//! decorative comments, and a few pre-laid-out blocks verbatim. The segments
//! are kept apart so the formatter can pretty-print code while leaving
//! banners and verbatim blocks untouched.

use proc_macro2::TokenStream;

/// One piece of emitted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Section banner title.
    Banner(String),
    /// Rust items rendered from tokens.
    Code(String),
    /// Rust items laid out by hand; passed through formatting unchanged.
    Verbatim(String),
}

/// Accumulates the segments of the file currently being generated.
#[derive(Debug, Default)]
pub struct Emitter {
    segments: Vec<Segment>,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends tokens followed by a newline.
    pub fn emit(&mut self, tokens: TokenStream) {
        let mut text = tokens.to_string();
        text.push('\n');
        match self.segments.last_mut() {
            Some(Segment::Code(code)) => code.push_str(&text),
            _ => self.segments.push(Segment::Code(text)),
        }
    }

    /// Appends text that must keep its layout.
    pub fn emit_verbatim(&mut self, text: impl Into<String>) {
        self.segments.push(Segment::Verbatim(text.into()));
    }

    /// Appends a banner framing `title` with `=` rules of the same length.
    pub fn section_banner(&mut self, title: impl Into<String>) {
        self.segments.push(Segment::Banner(title.into()));
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Concatenated raw text of every segment.
    pub fn raw_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Banner(title) => out.push_str(&banner_text(title)),
                Segment::Code(text) | Segment::Verbatim(text) => out.push_str(text),
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Clears the buffer for the next file.
    pub fn reset(&mut self) {
        self.segments.clear();
    }
}

/// Renders a banner comment block.
///
/// ```
/// use twirp_gen::emitter::banner_text;
///
/// assert_eq!(banner_text("Greeter"), "\n// =======\n// Greeter\n// =======\n\n");
/// ```
pub fn banner_text(title: &str) -> String {
    let rule = "=".repeat(title.len());
    format!("\n// {rule}\n// {title}\n// {rule}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    #[test]
    fn consecutive_code_is_merged() {
        let mut emitter = Emitter::new();
        emitter.emit(quote! { struct A; });
        emitter.emit(quote! { struct B; });
        assert_eq!(emitter.segments().len(), 1);
        assert_eq!(emitter.raw_text(), "struct A ;\nstruct B ;\n");
    }

    #[test]
    fn banners_split_code_segments() {
        let mut emitter = Emitter::new();
        emitter.emit(quote! { struct A; });
        emitter.section_banner("Greeter Interface");
        emitter.emit(quote! { struct B; });

        assert_eq!(
            emitter.segments(),
            &[
                Segment::Code("struct A ;\n".to_string()),
                Segment::Banner("Greeter Interface".to_string()),
                Segment::Code("struct B ;\n".to_string()),
            ]
        );
        let rule = "=".repeat("Greeter Interface".len());
        assert!(
            emitter
                .raw_text()
                .contains(&format!("// {rule}\n// Greeter Interface\n// {rule}\n"))
        );
    }

    #[test]
    fn verbatim_is_kept_as_is() {
        let mut emitter = Emitter::new();
        emitter.emit_verbatim("static X: &[u8] = &[\n    0x01,\n];\n");
        assert_eq!(emitter.raw_text(), "static X: &[u8] = &[\n    0x01,\n];\n");
    }

    #[test]
    fn reset_clears_everything() {
        let mut emitter = Emitter::new();
        emitter.emit(quote! { struct A; });
        emitter.section_banner("x");
        emitter.reset();
        assert!(emitter.is_empty());
        assert_eq!(emitter.raw_text(), "");
    }
}
