/// A manual assignment requested through the query string, e.g.
/// `?experiment=x-btn-1` forces variant 1 of experiment `btn`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualOverride {
    pub experiment_name: String,
    pub variant_index: usize,
}

/// Parse `<prefix>-<experimentName>-<variantIndex>`. The prefix token is
/// ignored. Anything but exactly three segments with a numeric index is
/// rejected.
pub fn parse_override(value: &str) -> Option<ManualOverride> {
    let parts: Vec<&str> = value.split('-').collect();
    let [_prefix, name, index] = parts.as_slice() else {
        return None;
    };
    if name.is_empty() {
        return None;
    }
    let variant_index = index.parse::<usize>().ok()?;
    Some(ManualOverride {
        experiment_name: name.to_string(),
        variant_index,
    })
}
