use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LabelError {
    #[error("Failed to read labels: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid class index file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid class index key {0:?}")]
    BadIndex(String),
    #[error("Class index is missing class {0}")]
    MissingClass(usize),
    #[error("Label file is empty")]
    Empty,
    #[error("Classifier returned {actual} scores for {expected} labels")]
    OutputSize { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassLabel {
    pub class_id: String,
    pub name: String,
}

/// The classifier's fixed label space, indexed by output position.
#[derive(Debug, Clone)]
pub struct LabelSet {
    classes: Vec<ClassLabel>,
}

impl LabelSet {
    pub fn new(classes: Vec<ClassLabel>) -> Self {
        Self { classes }
    }

    /// Loads either a Keras-style `{"0": ["n01440764", "tench"], ...}` JSON index
    /// or a plain text file with one label per line.
    pub fn load(path: &Path) -> Result<Self, LabelError> {
        let contents = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_class_index_json(&contents)
        } else {
            Self::from_lines(&contents)
        }
    }

    pub fn from_class_index_json(contents: &str) -> Result<Self, LabelError> {
        let raw: BTreeMap<String, (String, String)> = serde_json::from_str(contents)?;
        let mut indexed = BTreeMap::new();
        for (key, (class_id, name)) in raw {
            let index: usize = key.parse().map_err(|_| LabelError::BadIndex(key.clone()))?;
            indexed.insert(index, ClassLabel { class_id, name });
        }

        let mut classes = Vec::with_capacity(indexed.len());
        for (expected, (index, label)) in indexed.into_iter().enumerate() {
            if index != expected {
                return Err(LabelError::MissingClass(expected));
            }
            classes.push(label);
        }
        if classes.is_empty() {
            return Err(LabelError::Empty);
        }
        Ok(Self { classes })
    }

    /// One label per line. A leading WordNet id (`n01440764 tench`) becomes the class id,
    /// otherwise the line number does.
    pub fn from_lines(contents: &str) -> Result<Self, LabelError> {
        let classes: Vec<ClassLabel> = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .enumerate()
            .map(|(index, line)| match line.split_once(' ') {
                Some((id, name)) if is_wordnet_id(id) => ClassLabel {
                    class_id: id.to_string(),
                    name: name.trim().to_string(),
                },
                _ => ClassLabel {
                    class_id: index.to_string(),
                    name: line.to_string(),
                },
            })
            .collect();

        if classes.is_empty() {
            return Err(LabelError::Empty);
        }
        Ok(Self { classes })
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ClassLabel> {
        self.classes.get(index)
    }

    /// Maps a score vector to its `k` best `(class id, raw label, score)` triples,
    /// highest score first.
    pub fn decode_top_k(
        &self,
        scores: &[f32],
        k: usize,
    ) -> Result<Vec<(String, String, f32)>, LabelError> {
        if scores.len() != self.classes.len() {
            return Err(LabelError::OutputSize {
                expected: self.classes.len(),
                actual: scores.len(),
            });
        }

        let mut ranked: Vec<(usize, f32)> = scores.iter().copied().enumerate().collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(ranked
            .into_iter()
            .take(k)
            .map(|(index, score)| {
                let label = &self.classes[index];
                (label.class_id.clone(), label.name.clone(), score)
            })
            .collect())
    }
}

fn is_wordnet_id(token: &str) -> bool {
    token.len() == 9
        && token.starts_with('n')
        && token[1..].chars().all(|c| c.is_ascii_digit())
}
