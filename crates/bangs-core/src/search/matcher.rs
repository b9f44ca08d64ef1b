use bangs_types::{Bang, Dataset};

/// Bangs whose key starts with `prefix`, in dataset order.
///
/// Case-sensitive plain string prefix. An empty prefix matches every bang.
pub fn matching<'d>(prefix: &str, dataset: &'d Dataset) -> impl Iterator<Item = &'d Bang> {
    dataset.iter().filter(move |bang| bang.key.starts_with(prefix))
}

#[must_use]
pub fn matches<'a>(prefix: &str, dataset: &'a Dataset) -> Vec<&'a Bang> {
    matching(prefix, dataset).collect()
}

#[must_use]
pub fn first_match<'a>(prefix: &str, dataset: &'a Dataset) -> Option<&'a Bang> {
    matching(prefix, dataset).next()
}
