use std::collections::HashSet;

use ego_tree::NodeId;
use engine_logging::engine_debug;
use scraper::{ElementRef, Html};

use crate::rules::{BoilerplateRule, CleanContext, Removal, RuleKind};

/// Removal passes before giving up on reaching a fixed point.
const MAX_PASSES: usize = 8;

/// Strips platform boilerplate from a post body.
///
/// Every pass asks all rules about the same unmodified tree and removes the
/// union of their targets, so the outcome does not depend on rule order.
/// Passes repeat until nothing matches, which makes cleaning idempotent.
pub struct ContentCleaner {
    rules: Vec<Box<dyn BoilerplateRule>>,
}

impl Default for ContentCleaner {
    fn default() -> Self {
        Self::standard()
    }
}

impl ContentCleaner {
    /// All known rules.
    pub fn standard() -> Self {
        Self::with_kinds(RuleKind::ALL)
    }

    pub fn with_kinds(kinds: impl IntoIterator<Item = RuleKind>) -> Self {
        Self::with_rules(kinds.into_iter().map(RuleKind::rule).collect())
    }

    pub fn with_rules(rules: Vec<Box<dyn BoilerplateRule>>) -> Self {
        Self { rules }
    }

    /// Same cleaner minus one rule.
    pub fn without(mut self, kind: RuleKind) -> Self {
        self.rules.retain(|rule| rule.kind() != kind);
        self
    }

    pub fn kinds(&self) -> Vec<RuleKind> {
        self.rules.iter().map(|rule| rule.kind()).collect()
    }

    pub fn clean(&self, html: &str, ctx: &CleanContext<'_>) -> String {
        let mut fragment = Html::parse_fragment(html);

        for pass in 0..MAX_PASSES {
            let targets = self.collect_targets(&fragment, ctx);
            if targets.is_empty() {
                break;
            }
            engine_debug!("clean pass {}: removing {} subtrees", pass + 1, targets.len());
            for id in targets {
                if let Some(mut node) = fragment.tree.get_mut(id) {
                    node.detach();
                }
            }
        }

        fragment.root_element().inner_html()
    }

    fn collect_targets(&self, fragment: &Html, ctx: &CleanContext<'_>) -> HashSet<NodeId> {
        let root = fragment.root_element();
        let mut targets = HashSet::new();
        for element in root.descendants().skip(1).filter_map(ElementRef::wrap) {
            for rule in &self.rules {
                match rule.removal_target(element, ctx) {
                    Some(Removal::Subtree(id)) => {
                        targets.insert(id);
                    }
                    Some(Removal::FromHereOn(id)) => {
                        if let Some(start) = fragment.tree.get(id) {
                            targets.insert(id);
                            targets.extend(start.next_siblings().map(|sibling| sibling.id()));
                        }
                    }
                    None => {}
                }
            }
        }
        // Detaching the wrapper would leave nothing to serialize.
        targets.remove(&root.id());
        targets
    }
}
