use rand::seq::SliceRandom;
use rand::RngCore;

use crate::models::Medium;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub medium: Medium,
    pub prompt: String,
}

pub trait TaskProvider: Send + Sync {
    fn next_task(&self, hint: Option<Medium>, rng: &mut dyn RngCore) -> Task;
}

const DRAWING_TASKS: [&str; 6] = [
    "Draw a secret object that would help your team",
    "Draw a place where an important document could be hidden",
    "Draw a spy's disguised weapon",
    "Draw a listening device",
    "Draw a cipher your team would understand",
    "Draw a map of a secret facility",
];

const TEXT_TASKS: [&str; 6] = [
    "Describe an item that could point to a double agent",
    "Describe a meeting place for agents",
    "Write a code phrase agents can use to recognise each other",
    "Describe odd behaviour that could give a spy away",
    "Write a cover story for an undercover agent",
    "Name an operation in a way that means something to your team",
];

// 固定のお題リストから選ぶ
#[derive(Debug, Clone)]
pub struct TemplateTaskProvider {
    drawing: Vec<String>,
    text: Vec<String>,
}

impl TemplateTaskProvider {
    pub fn new(drawing: Vec<String>, text: Vec<String>) -> Self {
        Self { drawing, text }
    }
}

impl Default for TemplateTaskProvider {
    fn default() -> Self {
        Self::new(
            DRAWING_TASKS.iter().map(|s| s.to_string()).collect(),
            TEXT_TASKS.iter().map(|s| s.to_string()).collect(),
        )
    }
}

impl TaskProvider for TemplateTaskProvider {
    fn next_task(&self, hint: Option<Medium>, rng: &mut dyn RngCore) -> Task {
        let medium = match hint {
            Some(medium) => medium,
            None => *[Medium::Drawing, Medium::Text]
                .choose(rng)
                .unwrap_or(&Medium::Text),
        };
        let pool = match medium {
            Medium::Drawing => &self.drawing,
            Medium::Text => &self.text,
        };
        let prompt = pool
            .choose(rng)
            .cloned()
            .unwrap_or_else(|| format!("Create a {} that helps your team", medium));

        Task { medium, prompt }
    }
}
