use crate::model::types::{ConceptNode, DifficultyLevel};

const SEED_CONCEPTS: [&str; 5] = [
    "javascript-basics",
    "react-fundamentals",
    "typescript-intro",
    "node-js-basics",
    "database-design",
];

/// Concept metadata the explainer can describe, kept in registration order.
#[derive(Debug, Clone)]
pub struct ConceptLibrary {
    nodes: Vec<ConceptNode>,
}

impl Default for ConceptLibrary {
    fn default() -> Self {
        let mut library = Self::empty();
        for id in SEED_CONCEPTS {
            library.insert(ConceptNode {
                id: id.to_string(),
                name: title_case(id),
                description: format!("Learn about {id}"),
                prerequisites: Vec::new(),
                difficulty: DifficultyLevel::Intermediate,
            });
        }
        library
    }
}

impl ConceptLibrary {
    pub fn empty() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Replaces any node with the same id.
    pub fn insert(&mut self, node: ConceptNode) {
        match self.nodes.iter_mut().find(|existing| existing.id == node.id) {
            Some(existing) => *existing = node,
            None => self.nodes.push(node),
        }
    }

    pub fn get(&self, id: &str) -> Option<&ConceptNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Loose lookup for free text: exact id or name first, then substring
    /// containment on lowercase alphanumerics in either direction.
    pub fn find(&self, term: &str) -> Option<&ConceptNode> {
        let wanted = normalize(term);
        if wanted.is_empty() {
            return None;
        }
        let term = term.trim();

        self.nodes
            .iter()
            .find(|node| node.id == term || node.name.eq_ignore_ascii_case(term))
            .or_else(|| {
                self.nodes.iter().find(|node| {
                    let id = normalize(&node.id);
                    let name = normalize(&node.name);
                    id.contains(&wanted) || name.contains(&wanted) || wanted.contains(&id)
                })
            })
    }
}

fn normalize(text: &str) -> String {
    text.chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

fn title_case(id: &str) -> String {
    id.split('-')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_names() {
        let library = ConceptLibrary::default();
        assert_eq!(library.len(), 5);
        assert_eq!(library.get("node-js-basics").unwrap().name, "Node Js Basics");
        assert_eq!(
            library.get("javascript-basics").unwrap().description,
            "Learn about javascript-basics"
        );
    }

    #[test]
    fn test_fuzzy_find() {
        let library = ConceptLibrary::default();
        assert_eq!(library.find("React").unwrap().id, "react-fundamentals");
        assert_eq!(library.find("typescript?").unwrap().id, "typescript-intro");
        assert_eq!(library.find("Database Design").unwrap().id, "database-design");
        assert_eq!(
            library.find("the javascript-basics chapter").unwrap().id,
            "javascript-basics"
        );
        assert!(library.find("haskell").is_none());
        assert!(library.find("?!").is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut library = ConceptLibrary::empty();
        assert!(library.is_empty());
        let mut node = ConceptNode {
            id: "closures".into(),
            name: "Closures".into(),
            description: String::new(),
            prerequisites: vec![],
            difficulty: DifficultyLevel::Beginner,
        };
        library.insert(node.clone());
        node.prerequisites = vec!["functions".into()];
        library.insert(node);
        assert_eq!(library.len(), 1);
        assert_eq!(library.get("closures").unwrap().prerequisites, vec!["functions"]);
    }
}
