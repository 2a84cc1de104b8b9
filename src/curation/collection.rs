use crate::model::EnrichedRecipe;

/// Recipes accepted so far, including those seeded from earlier sessions.
///
/// Append-only: recipes are added on commit and never removed.
#[derive(Debug, Clone, Default)]
pub struct AcceptedCollection {
    recipes: Vec<EnrichedRecipe>,
}

impl AcceptedCollection {
    pub(crate) fn push(&mut self, recipe: EnrichedRecipe) {
        self.recipes.push(recipe);
    }

    pub(crate) fn extend<I>(&mut self, recipes: I)
    where
        I: IntoIterator<Item = EnrichedRecipe>,
    {
        self.recipes.extend(recipes);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    #[must_use]
    pub fn recipes(&self) -> &[EnrichedRecipe] {
        &self.recipes
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnrichedRecipe> {
        self.recipes.iter()
    }
}
