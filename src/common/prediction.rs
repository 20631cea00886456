use indexmap::IndexMap;

/// Label → probability as returned by a classifier, in the classifier's order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Prediction {
    probabilities: IndexMap<String, f64>,
}

impl Prediction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, label: impl Into<String>, probability: f64) -> Self {
        self.probabilities.insert(label.into(), probability);
        self
    }

    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.probabilities.get(label).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.probabilities.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Highest-probability entry. Equal probabilities keep the classifier's
    /// order, so the first one listed wins. NaN entries are never chosen.
    pub fn top(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, probability) in self.iter() {
            if probability.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if probability <= current => {}
                _ => best = Some((label, probability)),
            }
        }
        best
    }
}

impl<L: Into<String>> FromIterator<(L, f64)> for Prediction {
    fn from_iter<T: IntoIterator<Item = (L, f64)>>(iter: T) -> Self {
        Self {
            probabilities: iter.into_iter().map(|(l, p)| (l.into(), p)).collect(),
        }
    }
}
