use std::collections::BTreeMap;

use super::{Effect, EffectDescriptor};

/// Effects currently applied to the session's image.
///
/// Keyed by [`Effect`], so fragments always come out in catalogue order no
/// matter in which order effects were toggled on.
#[derive(Debug, Clone, Default)]
pub struct EffectStack {
    active: BTreeMap<Effect, EffectDescriptor>,
}

impl EffectStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, effect: Effect) -> bool {
        self.active.contains_key(&effect)
    }

    /// Add an effect. Returns `false` and keeps the existing descriptor if
    /// the effect is already active.
    pub fn activate(&mut self, descriptor: EffectDescriptor) -> bool {
        if self.contains(descriptor.effect()) {
            return false;
        }
        self.active.insert(descriptor.effect(), descriptor);
        true
    }

    /// Remove an effect. Returns `false` if it was not active.
    pub fn deactivate(&mut self, effect: Effect) -> bool {
        self.active.remove(&effect).is_some()
    }

    pub fn clear(&mut self) {
        self.active.clear();
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn effects(&self) -> impl Iterator<Item = Effect> + '_ {
        self.active.keys().copied()
    }

    /// The base locator with every active fragment stacked onto it.
    pub fn locator(&self, base: &str) -> String {
        combined_locator(base, self.active.values().map(|d| d.fragment()))
    }
}

/// Append fragments to `base` as a single `tr` query parameter.
/// With no fragments the base is returned untouched.
pub fn combined_locator<'a>(base: &str, fragments: impl IntoIterator<Item = &'a str>) -> String {
    let joined = fragments
        .into_iter()
        .filter(|f| !f.is_empty())
        .collect::<Vec<_>>()
        .join(",");
    if joined.is_empty() {
        return base.to_string();
    }
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}tr={joined}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://ik.imagekit.io/demo/cat.jpg";

    fn plain(effect: Effect) -> EffectDescriptor {
        EffectDescriptor::new(effect, None)
    }

    #[test]
    fn empty_stack_is_base() {
        assert_eq!(EffectStack::new().locator(BASE), BASE);
    }

    #[test]
    fn single_effect() {
        let mut stack = EffectStack::new();
        stack.activate(plain(Effect::RemoveBackground));
        assert_eq!(stack.locator(BASE), format!("{BASE}?tr=e-bgremove"));
    }

    #[test]
    fn order_is_catalogue_order_not_insertion_order() {
        let mut a = EffectStack::new();
        a.activate(plain(Effect::Upscale));
        a.activate(plain(Effect::RemoveBackground));

        let mut b = EffectStack::new();
        b.activate(plain(Effect::RemoveBackground));
        b.activate(plain(Effect::Upscale));

        assert_eq!(a.locator(BASE), b.locator(BASE));
        assert_eq!(a.locator(BASE), format!("{BASE}?tr=e-bgremove,e-upscale"));
    }

    #[test]
    fn activate_twice_is_idempotent() {
        let mut stack = EffectStack::new();
        assert!(stack.activate(EffectDescriptor::new(
            Effect::Edit,
            Some("first".to_string())
        )));
        assert!(!stack.activate(EffectDescriptor::new(
            Effect::Edit,
            Some("second".to_string())
        )));
        assert_eq!(stack.len(), 1);
        assert_eq!(stack.locator(BASE), format!("{BASE}?tr=e-edit:first"));
    }

    #[test]
    fn deactivate_last_restores_base() {
        let mut stack = EffectStack::new();
        stack.activate(plain(Effect::Retouch));
        assert!(stack.deactivate(Effect::Retouch));
        assert!(stack.is_empty());
        assert_eq!(stack.locator(BASE), BASE);
    }

    #[test]
    fn deactivate_missing_returns_false() {
        let mut stack = EffectStack::new();
        assert!(!stack.deactivate(Effect::Retouch));
    }

    #[test]
    fn prompts_survive_recompute() {
        let mut stack = EffectStack::new();
        stack.activate(EffectDescriptor::new(
            Effect::ChangeBackground,
            Some("beach".to_string()),
        ));
        stack.activate(plain(Effect::DropShadow));
        stack.deactivate(Effect::DropShadow);
        assert_eq!(stack.locator(BASE), format!("{BASE}?tr=e-changebg-prompt-beach"));
    }

    #[test]
    fn base_with_query_uses_ampersand() {
        let fragments = ["e-upscale"];
        assert_eq!(
            combined_locator("https://cdn/x.png?v=2", fragments),
            "https://cdn/x.png?v=2&tr=e-upscale"
        );
    }

    #[test]
    fn empty_fragments_are_skipped() {
        assert_eq!(combined_locator(BASE, ["", ""]), BASE);
    }
}
