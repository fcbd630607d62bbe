//! Raw/rendered toggling for a single prompt.

use crate::content::processor::{ContentProcessor, EditMap};
use crate::content::source::FileSource;

/// One prompt and the edits captured from it.
///
/// The edit map belongs to the session; it is never shared between
/// sessions and needs no synchronization.
#[derive(Debug, Clone, Default)]
pub struct PromptSession {
    raw: String,
    edits: EditMap,
    rendered: Option<String>,
}

impl PromptSession {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            ..Self::default()
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Replace the raw text, as when the user types outside render mode.
    /// The edit map is kept as it is.
    pub fn set_raw(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
    }

    pub fn edits(&self) -> &EditMap {
        &self.edits
    }

    pub fn clear_edits(&mut self) {
        self.edits.clear();
    }

    /// Whether [`PromptSession::enter_render`] has been called without a
    /// matching [`PromptSession::leave_render`].
    pub fn is_rendered(&self) -> bool {
        self.rendered.is_some()
    }

    /// Render the raw text with the session's edits applied.
    pub fn enter_render<F: FileSource>(&mut self, processor: &ContentProcessor<F>) -> String {
        let rendered = processor.render(&self.raw, &self.edits);
        self.rendered = Some(rendered.clone());
        rendered
    }

    /// Return to raw text after the user has seen (and maybe changed) the
    /// rendered text.
    ///
    /// Untouched rendered text keeps the raw text and edits as they were.
    /// Otherwise the edit map is replaced by the one recovered from `edited`
    /// and its collapsed form becomes the new raw text.
    pub fn leave_render<F: FileSource>(
        &mut self,
        processor: &ContentProcessor<F>,
        edited: &str,
    ) -> &str {
        let shown = self.rendered.take();
        if shown.as_deref() == Some(edited) {
            return &self.raw;
        }

        let unrendered = processor.unrender(edited);
        tracing::debug!(
            edits = unrendered.edits.len(),
            malformed = unrendered.malformed.len(),
            "Captured rendered edits"
        );
        self.raw = unrendered.text;
        self.edits = unrendered.edits;
        &self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::source::RootFiles;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ContentProcessor<RootFiles>) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("a/foo.py"), "x=1").unwrap();
        let processor = ContentProcessor::new(RootFiles::new(dir.path()));
        (dir, processor)
    }

    #[test]
    fn test_untouched_render_keeps_raw() {
        let (_dir, processor) = setup();
        let mut session = PromptSession::new("see a/foo.py");

        let rendered = session.enter_render(&processor);
        assert!(session.is_rendered());
        assert_eq!(session.leave_render(&processor, &rendered), "see a/foo.py");
        assert!(!session.is_rendered());
        assert!(session.edits().is_empty());
    }

    #[test]
    fn test_edits_survive_toggle() {
        let (_dir, processor) = setup();
        let mut session = PromptSession::new("see a/foo.py");

        let rendered = session.enter_render(&processor);
        let edited = format!("{}!", rendered.replace("x=1", "x=2"));
        assert_eq!(session.leave_render(&processor, &edited), "see a/foo.py!");
        assert_eq!(session.edits()["a/foo.py"].edited_content, "x=2");

        // Rendering again shows the edit rather than the file
        let again = session.enter_render(&processor);
        assert!(again.contains("\nx=2\n"));
        session.leave_render(&processor, &again);
        assert_eq!(session.edits().len(), 1);
    }

    #[test]
    fn test_reverting_edit_clears_it() {
        let (_dir, processor) = setup();
        let mut session = PromptSession::new("a/foo.py");

        let rendered = session.enter_render(&processor);
        session.leave_render(&processor, &rendered.replace("x=1", "x=2"));
        assert_eq!(session.edits().len(), 1);

        let rendered = session.enter_render(&processor);
        session.leave_render(&processor, &rendered.replace("x=2", "x=1"));
        assert!(session.edits().is_empty());
    }

    #[test]
    fn test_typed_text_and_cleared_edits() {
        let (_dir, processor) = setup();
        let mut session = PromptSession::new("a/foo.py");

        let rendered = session.enter_render(&processor);
        session.leave_render(&processor, &rendered.replace("x=1", "x=2"));

        session.set_raw("first a/foo.py then more");
        assert_eq!(session.raw(), "first a/foo.py then more");
        let rendered = session.enter_render(&processor);
        assert!(rendered.contains("\nx=2\n"));
        session.leave_render(&processor, &rendered);
        assert_eq!(session.edits().len(), 1);

        session.clear_edits();
        assert!(session.edits().is_empty());
        assert!(session.enter_render(&processor).contains("\nx=1\n"));
    }
}
