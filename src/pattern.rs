use bit_set::BitSet;
use std::collections::HashMap;

/// Items occurring at the same time, stored by their interned ids.
pub type ItemSet = BitSet;

/// An ordered list of ItemSets. Patterns and sequences share this shape.
pub type Pattern = Vec<ItemSet>;

/// Interns item labels into dense ids.
///
/// Ids follow ascending label order once [`Alphabet::from_labels`] has
/// been used, so two databases built from the same rows agree on every id.
#[derive(Clone, Debug, Default)]
pub struct Alphabet {
    labels: Vec<String>,
    ids: HashMap<String, usize>,
}

impl Alphabet {
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        labels.sort_unstable();
        labels.dedup();
        let ids = labels
            .iter()
            .enumerate()
            .map(|(id, label)| (label.clone(), id))
            .collect();
        Self { labels, ids }
    }

    pub fn id(&self, label: &str) -> Option<usize> {
        self.ids.get(label).copied()
    }

    pub fn label(&self, id: usize) -> &str {
        &self.labels[id]
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Build a pattern from label groups, `None` if any label is unknown.
    pub fn pattern<'a, E>(&self, elements: &[E]) -> Option<Pattern>
    where
        E: AsRef<[&'a str]>,
    {
        elements
            .iter()
            .map(|element| {
                element
                    .as_ref()
                    .iter()
                    .map(|label| self.id(label))
                    .collect::<Option<ItemSet>>()
            })
            .collect()
    }

    /// Parse the [`Alphabet::render`] form back into a pattern.
    pub fn parse(&self, text: &str) -> Option<Pattern> {
        text.split("->")
            .map(|element| {
                let element = element.trim();
                let inner = element
                    .strip_prefix('{')
                    .and_then(|rest| rest.strip_suffix('}'))
                    .unwrap_or(element);
                let set: ItemSet = inner
                    .split(',')
                    .map(|label| self.id(label.trim()))
                    .collect::<Option<_>>()?;
                if set.is_empty() {
                    None
                } else {
                    Some(set)
                }
            })
            .collect()
    }

    /// Render as `a -> {b, c} -> d`.
    pub fn render(&self, pattern: &[ItemSet]) -> String {
        pattern
            .iter()
            .map(|element| {
                let labels: Vec<&str> = element.iter().map(|id| self.label(id)).collect();
                if labels.len() == 1 {
                    labels[0].to_string()
                } else {
                    format!("{{{}}}", labels.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

pub fn singleton(item: usize) -> ItemSet {
    let mut set = ItemSet::new();
    set.insert(item);
    set
}

/// Total number of items, which is the level a pattern is mined at.
pub fn item_count(pattern: &[ItemSet]) -> usize {
    pattern.iter().map(ItemSet::len).sum()
}

/// Remove the lowest item of the first element.
pub fn drop_first_item(pattern: &[ItemSet]) -> Pattern {
    let mut result = pattern.to_vec();
    if let Some(first) = result.first_mut() {
        if let Some(item) = first.iter().next() {
            first.remove(item);
        }
        if first.is_empty() {
            result.remove(0);
        }
    }
    result
}

/// Remove the highest item of the last element.
pub fn drop_last_item(pattern: &[ItemSet]) -> Pattern {
    let mut result = pattern.to_vec();
    if let Some(last) = result.last_mut() {
        if let Some(item) = last.iter().last() {
            last.remove(item);
        }
        if last.is_empty() {
            result.pop();
        }
    }
    result
}

/// Every pattern obtained by deleting exactly one item; an element
/// emptied by the deletion disappears.
pub fn sub_patterns(pattern: &[ItemSet]) -> Vec<Pattern> {
    let mut result = Vec::with_capacity(item_count(pattern));
    for (idx, element) in pattern.iter().enumerate() {
        if element.len() == 1 {
            let mut sub = pattern.to_vec();
            sub.remove(idx);
            result.push(sub);
            continue;
        }
        for item in element.iter() {
            let mut sub = pattern.to_vec();
            sub[idx].remove(item);
            result.push(sub);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alphabet() -> Alphabet {
        Alphabet::from_labels(vec!["c", "a", "b", "a"])
    }

    #[test]
    fn test_ids_follow_label_order() {
        let alphabet = alphabet();
        assert_eq!(alphabet.len(), 3);
        assert_eq!(alphabet.id("a"), Some(0));
        assert_eq!(alphabet.id("c"), Some(2));
        assert_eq!(alphabet.id("z"), None);
        assert_eq!(alphabet.label(1), "b");
    }

    #[test]
    fn test_render() {
        let alphabet = alphabet();
        let pattern = alphabet.pattern(&[vec!["a"], vec!["c", "b"]]).unwrap();
        assert_eq!(alphabet.render(&pattern), "a -> {b, c}");
        assert_eq!(item_count(&pattern), 3);
        assert_eq!(alphabet.parse("a -> {c, b}"), Some(pattern));
        assert_eq!(alphabet.parse("a -> z"), None);
    }

    #[test]
    fn test_drop_first_and_last() {
        let alphabet = alphabet();
        let pattern = alphabet.pattern(&[vec!["a", "b"], vec!["c"]]).unwrap();
        assert_eq!(
            drop_first_item(&pattern),
            alphabet.pattern(&[vec!["b"], vec!["c"]]).unwrap()
        );
        assert_eq!(
            drop_last_item(&pattern),
            alphabet.pattern(&[vec!["a", "b"]]).unwrap()
        );
    }

    #[test]
    fn test_sub_patterns_cover_every_item() {
        let alphabet = alphabet();
        let pattern = alphabet.pattern(&[vec!["a", "b"], vec!["c"]]).unwrap();
        let subs = sub_patterns(&pattern);
        assert_eq!(subs.len(), 3);
        assert!(subs.contains(&alphabet.pattern(&[vec!["b"], vec!["c"]]).unwrap()));
        assert!(subs.contains(&alphabet.pattern(&[vec!["a"], vec!["c"]]).unwrap()));
        assert!(subs.contains(&alphabet.pattern(&[vec!["a", "b"]]).unwrap()));
    }
}
