//! Host-runtime collaborators.
//!
//! The front end resolves nothing on the host side. A namespace import is recorded as an
//! `Import` statement and announced to a [`NamespaceLinker`] so the host can prepare it.

/// Receives every `IMPORT Name.Space` request, in source order.
pub trait NamespaceLinker {
    fn link_namespace(&mut self, namespace: &str);
}

/// Ignores all requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLinker;

impl NamespaceLinker for NullLinker {
    fn link_namespace(&mut self, _namespace: &str) {}
}

/// Keeps every requested namespace.
#[derive(Debug, Default, Clone)]
pub struct RecordingLinker {
    pub namespaces: Vec<String>,
}

impl NamespaceLinker for RecordingLinker {
    fn link_namespace(&mut self, namespace: &str) {
        self.namespaces.push(namespace.to_string());
    }
}
