use crate::internal::*;
use crate::layout::ConvertLayout;
use std::fmt::Debug;

pub fn get_transform(name: &str) -> Option<Box<dyn ModelTransform>> {
    match name {
        name if name.starts_with("convert-layout") => {
            build_layout_converter(name.strip_prefix("convert-layout"))
        }
        _ => None,
    }
}

/// Build a layout converter given a filter_predicate. If the filter_predicate is none, empty,
/// or lists no pattern, all matching nodes are considered.
///
/// filter_predicate format:
/// - `==node-name/layer,node-name-layer.1`: Only node which has a name that contains `node-name/layer` or `node-name-layer.1`
/// - `!=node-name/layer,node-name-layer.1`: Only node which has a name that doesn't contain `node-name/layer` or `node-name-layer.1`
pub fn build_layout_converter(filter_predicate: Option<&str>) -> Option<Box<dyn ModelTransform>> {
    let Some(filter_predicate) = filter_predicate.filter(|f| !f.is_empty()) else {
        return Some(Box::<ConvertLayout>::default());
    };
    let (keep_matching, node_name_patterns) =
        if let Some(patterns) = filter_predicate.strip_prefix("!=") {
            (false, patterns)
        } else if let Some(patterns) = filter_predicate.strip_prefix("==") {
            (true, patterns)
        } else {
            return None;
        };
    let patterns = node_name_patterns
        .split(',')
        .map(|it| it.trim())
        .filter(|it| !it.is_empty())
        .map(|it| it.to_string())
        .collect::<Vec<_>>();
    if patterns.is_empty() {
        return Some(Box::<ConvertLayout>::default());
    }
    Some(Box::new(ConvertLayout::default().with_veto(move |node| {
        patterns.iter().any(|p| node.name.contains(p)) != keep_matching
    })))
}

pub trait ModelTransform: Debug {
    fn name(&self) -> Cow<'_, str>;
    fn transform(&self, model: &mut Model) -> ChanlastResult<()>;
    fn transform_into(&self, model: &Model) -> ChanlastResult<Model> {
        let mut model = model.clone();
        self.transform(&mut model)?;
        Ok(model)
    }
}
