//! Codec table: registered codecs by id and by descriptor class.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;
use tracing::{debug, info};

use super::CodecEntry;
use crate::core::ClassId;
use crate::util::{Error, Result};

/// Registered codecs of a session.
///
/// Ids are unique. Several codecs may share a descriptor class; lookups by
/// class return the most recent registration first.
#[derive(Debug, Default)]
pub struct CodecTable {
    by_id: HashMap<String, Arc<CodecEntry>>,
    order: Vec<String>,
    by_class: HashMap<ClassId, SmallVec<[Arc<CodecEntry>; 2]>>,
}

impl CodecTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Add a codec. A second codec with the same id is an error.
    pub fn register(&mut self, entry: CodecEntry) -> Result<()> {
        let id = entry.id().to_string();
        if self.by_id.contains_key(&id) {
            return Err(Error::DuplicateCodec(id));
        }
        let entry = Arc::new(entry);
        if let Some(class) = entry.meta().mdes_class {
            let shared = self.by_class.entry(class).or_default();
            shared.push(entry.clone());
            if shared.len() > 1 {
                debug!(codec = %id, %class, count = shared.len(), "descriptor class shared by several codecs");
            }
        }
        info!(codec = %id, name = %entry.meta().name, "codec added to table");
        self.by_id.insert(id.clone(), entry);
        self.order.push(id);
        Ok(())
    }

    /// Codec registered under `id`.
    pub fn by_id(&self, id: &str) -> Result<Arc<CodecEntry>> {
        self.by_id
            .get(id)
            .cloned()
            .ok_or_else(|| Error::CodecNotFound(id.to_string()))
    }

    /// Codecs for a descriptor class, newest registration first.
    pub fn by_class(&self, class: ClassId) -> Vec<Arc<CodecEntry>> {
        self.by_class
            .get(&class)
            .map(|list| list.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Ids in registration order.
    pub fn ids(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CodecEntry>> {
        self.order.iter().filter_map(|id| self.by_id.get(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, CodecMetaInfo, CODEC_REVISION, PICTURE_KIND};
    use crate::core::Revision;

    struct Named(&'static str, Option<ClassId>);

    impl Codec for Named {
        fn meta_info(&self) -> CodecMetaInfo {
            CodecMetaInfo {
                id: self.0.into(),
                name: format!("{} test codec", self.0),
                min_revision: Revision::V2,
                max_revision: Revision::V2,
                data_kinds: vec![PICTURE_KIND.into()],
                mdes_class: self.1,
                data_class: None,
                codec_revision: CODEC_REVISION,
            }
        }
    }

    fn entry(id: &'static str, class: Option<ClassId>) -> CodecEntry {
        CodecEntry::new(Arc::new(Named(id, class))).unwrap()
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut table = CodecTable::new();
        table.register(entry("ONE", None)).unwrap();
        assert!(matches!(
            table.register(entry("ONE", None)),
            Err(Error::DuplicateCodec(id)) if id == "ONE"
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_class_index_keeps_all_newest_first() {
        let mut table = CodecTable::new();
        table.register(entry("RAW", Some(ClassId::CDCI))).unwrap();
        table.register(entry("WRAP", Some(ClassId::CDCI))).unwrap();
        table.register(entry("LOOSE", None)).unwrap();

        let ids: Vec<_> = table.by_class(ClassId::CDCI).iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["WRAP", "RAW"]);
        assert!(table.by_class(ClassId::WAVD).is_empty());
        assert_eq!(table.ids(), vec!["RAW", "WRAP", "LOOSE"]);
        assert_eq!(table.iter().count(), 3);
    }

    #[test]
    fn test_missing_id() {
        let table = CodecTable::new();
        assert!(table.is_empty());
        assert!(matches!(table.by_id("NOPE"), Err(Error::CodecNotFound(_))));
    }
}
