use crate::internal::*;
use std::collections::BTreeMap;

/// Free-form provenance attributes attached to a node.
///
/// The graph itself never interprets them. Rewrites copy the attributes of
/// the node they replace onto every node they create, so tooling can trace
/// the origin of a rewritten subgraph.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct RuntimeInfo(BTreeMap<String, String>);

impl RuntimeInfo {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(|s| &**s)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (&**k, &**v))
    }

    /// Merges `other` into `self`. Attributes already present are kept.
    pub fn merge(&mut self, other: &RuntimeInfo) {
        for (k, v) in other.iter() {
            self.0.entry(k.to_string()).or_insert_with(|| v.to_string());
        }
    }
}

impl From<BTreeMap<String, String>> for RuntimeInfo {
    fn from(map: BTreeMap<String, String>) -> RuntimeInfo {
        RuntimeInfo(map)
    }
}

/// Copies the provenance of `from` onto each node listed in `to`.
pub fn copy_runtime_info(from: &RuntimeInfo, model: &mut Model, to: &[usize]) -> ChanlastResult<()> {
    for &id in to {
        ensure!(id < model.nodes.len(), "Invalid node id {id} for provenance copy");
        model.nodes[id].rt_info.merge(from);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreemap;

    #[test]
    fn merge_keeps_existing() {
        let mut info = RuntimeInfo::default().with("origin", "b");
        let other: RuntimeInfo = btreemap!(
            "origin".to_string() => "a".to_string(),
            "layer".to_string() => "conv1".to_string(),
        )
        .into();
        info.merge(&other);
        assert_eq!(info.get("origin"), Some("b"));
        assert_eq!(info.get("layer"), Some("conv1"));
        assert_eq!(info.len(), 2);
    }

    #[test]
    fn copy_to_nodes() {
        let mut model = Model::default();
        let a = model.add_source("a", f32::fact([1])).unwrap();
        let b = model.add_source("b", f32::fact([1])).unwrap();
        let info = RuntimeInfo::default().with("origin", "conv1");
        copy_runtime_info(&info, &mut model, &[a.node, b.node]).unwrap();
        assert_eq!(model.node(a.node).rt_info, info);
        assert_eq!(model.node(b.node).rt_info, info);
        assert!(copy_runtime_info(&info, &mut model, &[12]).is_err());
    }
}
