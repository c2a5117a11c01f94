//! Level-appropriate prose, examples and diagrams for a (concept, level) pair.
//!
//! Summary and analogy phrasing is picked from a per-tier pool through a
//! [`VariantSource`], so tests can pin the choice.

use std::sync::Arc;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::model::types::DifficultyLevel;

pub trait VariantSource: Send + Sync {
    /// Index in `0..len`; `len` is always non-zero.
    fn pick(&self, len: usize) -> usize;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl VariantSource for ThreadRngSource {
    fn pick(&self, len: usize) -> usize {
        rand::rng().random_range(0..len)
    }
}

pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl VariantSource for SeededSource {
    fn pick(&self, len: usize) -> usize {
        self.rng.lock().random_range(0..len)
    }
}

/// Always returns the same slot, clamped to the pool size.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub usize);

impl VariantSource for FixedSource {
    fn pick(&self, len: usize) -> usize {
        self.0.min(len.saturating_sub(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExample {
    pub language: String,
    pub code: String,
    pub explanation: String,
    pub runnable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagramKind {
    Flowchart,
    Architecture,
    Sequence,
    Class,
    Network,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramData {
    #[serde(rename = "type")]
    pub kind: DiagramKind,
    pub title: String,
    /// Mermaid source.
    pub data: String,
    pub description: String,
}

#[derive(Clone)]
pub struct ContentGenerator {
    source: Arc<dyn VariantSource>,
}

impl Default for ContentGenerator {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRngSource))
    }
}

impl ContentGenerator {
    pub fn new(source: Arc<dyn VariantSource>) -> Self {
        Self { source }
    }

    fn choose(&self, pool: Vec<String>) -> String {
        let index = self.source.pick(pool.len());
        pool.into_iter().nth(index).unwrap_or_default()
    }

    pub fn summary(&self, concept: &str, level: DifficultyLevel) -> String {
        let pool = match level {
            DifficultyLevel::Beginner => vec![
                format!("{concept} is a fundamental building block in this domain. Think of it as a starting point."),
                format!("At its core, {concept} handles basic operations essential for beginners."),
                format!("{concept} introduces the primary syntax and structure you need to get started."),
            ],
            DifficultyLevel::Intermediate => vec![
                format!("{concept} connects multiple basic ideas to form more complex workflows."),
                format!("With {concept}, you can handle more specific cases and error states."),
                format!("{concept} bridges the gap between simple scripts and structured applications."),
            ],
            DifficultyLevel::Advanced => vec![
                format!("{concept} allows for performance optimization and custom architectural patterns."),
                format!("In advanced scenarios, {concept} manages scalability and asynchronous complexities."),
                format!("Deep understanding of {concept} unlocks meta-programming and internal customization."),
            ],
            DifficultyLevel::Expert => vec![
                format!("{concept} at an expert level involves compiler-level optimizations and memory management."),
                format!("Mastery of {concept} enables you to contribute to core libraries and define standards."),
                format!("{concept} is critical for high-frequency low-latency systems."),
            ],
        };
        self.choose(pool)
    }

    pub fn detailed(&self, concept: &str, level: DifficultyLevel) -> String {
        format!("Detailed explanation of {concept} at {level} level generated dynamically.")
    }

    pub fn example(&self, concept: &str, level: DifficultyLevel) -> CodeExample {
        let ident = concept.to_lowercase().replace(['-', ' '], "_");
        let type_name = pascal_case(concept);

        let (code, explanation) = match level {
            DifficultyLevel::Beginner => (
                format!("// Basic usage of {concept}\nconst result = {ident}(basicInput);\nconsole.log(result);"),
                format!("A simple example showing the default behavior of {concept}."),
            ),
            DifficultyLevel::Intermediate => (
                format!(
                    "// Error handling with {concept}\ntry {{\n  const data = await {ident}(input);\n}} catch (e) {{\n  console.error('Failed:', e);\n}}"
                ),
                format!("Handling common edge cases and errors when using {concept}."),
            ),
            DifficultyLevel::Advanced => (
                format!(
                    "// Async pattern with {concept}\nconst pipeline = new {type_name}Pipeline();\npipeline.use(middleware).process(data);"
                ),
                format!("Integrating {concept} into a larger asynchronous processing pipeline."),
            ),
            DifficultyLevel::Expert => (
                format!(
                    "// Custom implementation of {concept}\nclass Optimized{type_name} extends Core{type_name} {{\n  constructor(opts) {{ super(opts); }}\n}}"
                ),
                format!("Extending the core behavior of {concept} for performance."),
            ),
        };

        CodeExample {
            language: "typescript".to_string(),
            code,
            explanation,
            runnable: true,
        }
    }

    pub fn analogy(&self, concept: &str, level: DifficultyLevel) -> String {
        let lower = concept.to_lowercase();
        let pool = match level {
            DifficultyLevel::Beginner => vec![
                format!("Think of {lower} like a recipe: follow the steps in order and you get a predictable dish."),
                format!("Imagine {concept} as a blueprint for constructing a building."),
                format!("{concept} is similar to how a library organizes books by category."),
            ],
            DifficultyLevel::Intermediate => vec![
                format!("{concept} acts like a traffic controller directing data flow."),
                format!("Think of {lower} like a car engine's transmission system."),
                format!("{concept} works like a postal sorting office routing parcels to the right van."),
            ],
            DifficultyLevel::Advanced => vec![
                format!("{concept} behaves like an air-traffic tower juggling many flights at once."),
                format!("Think of {lower} as a factory assembly line tuned for throughput."),
            ],
            DifficultyLevel::Expert => vec![
                format!("{concept} is like designing the rules of the road rather than driving on it."),
                format!("Think of {lower} as the power grid: invisible until you need to rebalance it under load."),
            ],
        };
        self.choose(pool)
    }

    pub fn diagram(&self, concept: &str, level: DifficultyLevel) -> DiagramData {
        let node = pascal_case(concept);
        let data = match level {
            DifficultyLevel::Beginner | DifficultyLevel::Intermediate => {
                format!("graph TD;\n  Start --> {node};\n  {node} --> End;")
            }
            DifficultyLevel::Advanced | DifficultyLevel::Expert => format!(
                "graph TD;\n  Input --> {node};\n  {node} --> Optimize;\n  Optimize --> {node};\n  {node} --> Output;"
            ),
        };

        DiagramData {
            kind: DiagramKind::Flowchart,
            title: format!("{concept} Workflow ({level})"),
            data,
            description: format!(
                "A visual flow of how {concept} processes data at the {level} level."
            ),
        }
    }

    pub fn step_by_step(&self, concept: &str, level: DifficultyLevel) -> Vec<String> {
        let mut steps = vec![
            format!("Step 1: Understand the basics of {concept}"),
            "Step 2: Practice with simple examples".to_string(),
            "Step 3: Apply to real-world scenarios".to_string(),
        ];
        if level >= DifficultyLevel::Advanced {
            steps.push(format!("Step 4: Profile and optimize {concept} under load"));
        }
        steps
    }
}

fn pascal_case(concept: &str) -> String {
    concept
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect()
}
