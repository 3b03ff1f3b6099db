use std::fmt;

use kectl_core::ResourceIdentity;

use crate::{Record, StoreError};

/// Per-record callback. Records are lent for the duration of the call only.
pub type Response<'a> = Box<dyn FnMut(&Record) -> anyhow::Result<()> + Send + 'a>;

/// Parameters of one logical store operation.
///
/// Built with the consuming setters below; a later setter for the same field
/// overwrites an earlier one. Nothing is validated here: combinations that
/// cannot be addressed are rejected by [`crate::assemble_key`].
#[derive(Default)]
pub struct Op<'a> {
    resource: Option<ResourceIdentity>,
    name: String,
    namespace: String,
    response: Option<Response<'a>>,
    page_limit: i64,
    keys_only: bool,
    revision: i64,
}

impl<'a> Op<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, resource: ResourceIdentity) -> Self {
        self.resource = Some(resource);
        self
    }

    /// Target object; `namespace` may be empty for cluster-scoped objects.
    pub fn name(mut self, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.name = name.into();
        self.namespace = namespace.into();
        self
    }

    pub fn response<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Record) -> anyhow::Result<()> + Send + 'a,
    {
        self.response = Some(Box::new(f));
        self
    }

    /// Maximum records per range request; 0 reads the whole range at once.
    pub fn page_limit(mut self, limit: i64) -> Self {
        self.page_limit = limit;
        self
    }

    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    /// Read (or start watching) at this revision; 0 means latest.
    pub fn revision(mut self, revision: i64) -> Self {
        self.revision = revision;
        self
    }

    pub fn target(&self) -> Option<&ResourceIdentity> {
        self.resource.as_ref()
    }

    pub fn target_name(&self) -> &str {
        &self.name
    }

    pub fn target_namespace(&self) -> &str {
        &self.namespace
    }

    pub fn get_page_limit(&self) -> i64 {
        self.page_limit
    }

    pub fn is_keys_only(&self) -> bool {
        self.keys_only
    }

    pub fn get_revision(&self) -> i64 {
        self.revision
    }

    pub(crate) fn respond(&mut self, record: &Record) -> Result<(), StoreError> {
        match self.response.as_mut() {
            Some(f) => f(record).map_err(|source| StoreError::Response { key: record.key_str().into_owned(), source }),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Op<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Op")
            .field("resource", &self.resource)
            .field("name", &self.name)
            .field("namespace", &self.namespace)
            .field("response", &self.response.is_some())
            .field("page_limit", &self.page_limit)
            .field("keys_only", &self.keys_only)
            .field("revision", &self.revision)
            .finish()
    }
}
