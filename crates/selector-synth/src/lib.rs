//! Selector synthesis - stable, human-meaningful locators
//!
//! Turns an element description into a locator string by walking an ordered
//! list of strategies, first match wins:
//! - identity attributes (`id`, `aria-label`, `title`, test ids, `name`)
//! - accessible semantics (form labels, ARIA role + name, landmarks)
//! - visible content (button/link text, image alt)
//! - a de-noised class combination confirmed unique on the page
//! - landmark context, and finally a positional path that marks shadow-root
//!   crossings
//!
//! Synthesis never fails: every branch ends in the positional path.

pub mod patterns;
pub mod strategies;
pub mod synth;
pub mod target;
pub mod text;

pub use strategies::{SelectorStrategy, StrategyKind, StrategyOutcome, SynthContext};
pub use synth::{detached_selector, SelectorSynthesizer, SHADOW_MARKER};
pub use target::{form_label_text, implicit_role, is_interactive, target_info};
