/// A ready-made recipe the user can load instead of pasting one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub name: &'static str,
    pub recipe: &'static str,
}

pub static PRESETS: [Preset; 4] = [
    Preset {
        name: "Spaghetti Aglio e Olio",
        recipe: "Spaghetti aglio e olio: 200g spaghetti, 4 cloves garlic thinly sliced, \
                 60ml olive oil, 1 tsp chili flakes, parsley, salt. Boil the spaghetti in \
                 salted water until al dente. Gently fry the garlic and chili in olive oil \
                 until golden. Toss the drained pasta in the oil with a splash of pasta \
                 water and finish with parsley.",
    },
    Preset {
        name: "Vegetable Stir Fry",
        recipe: "Vegetable stir fry: 1 bell pepper, 1 carrot, 1 cup broccoli, 2 tbsp soy \
                 sauce, 1 tbsp sesame oil, 1 tsp grated ginger, 2 cloves garlic. Slice the \
                 vegetables thinly. Heat the sesame oil in a wok over high heat. Stir fry \
                 garlic and ginger for 30 seconds, add the vegetables and cook for 5 minutes, \
                 then add soy sauce and serve over rice.",
    },
    Preset {
        name: "Fluffy Pancakes",
        recipe: "Pancakes: 1 cup flour, 1 tbsp sugar, 2 tsp baking powder, pinch of salt, \
                 1 cup milk, 1 egg, 2 tbsp melted butter. Whisk the dry ingredients. Whisk \
                 milk, egg and butter separately, then combine without overmixing. Rest the \
                 batter 5 minutes. Cook ladlefuls on a buttered pan until bubbles form, flip \
                 and cook until golden.",
    },
    Preset {
        name: "Tomato Soup",
        recipe: "Tomato soup: 1kg ripe tomatoes, 1 onion, 2 cloves garlic, 500ml vegetable \
                 stock, 2 tbsp olive oil, basil, salt and pepper. Soften the chopped onion and \
                 garlic in olive oil. Add the chopped tomatoes and stock and simmer for 25 \
                 minutes. Blend until smooth, season and stir in torn basil.",
    },
];

/// Find a preset by 1-based position or by case-insensitive name prefix.
pub fn find_preset(query: &str) -> Option<&'static Preset> {
    let query = query.trim();
    if query.is_empty() {
        return None;
    }
    if let Ok(index) = query.parse::<usize>() {
        return index.checked_sub(1).and_then(|i| PRESETS.get(i));
    }
    let query = query.to_lowercase();
    PRESETS
        .iter()
        .find(|p| p.name.to_lowercase().starts_with(&query))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_index_and_name() {
        assert_eq!(find_preset("1").map(|p| p.name), Some("Spaghetti Aglio e Olio"));
        assert_eq!(find_preset("tomato").map(|p| p.name), Some("Tomato Soup"));
        assert_eq!(find_preset("Fluffy Pancakes").map(|p| p.name), Some("Fluffy Pancakes"));
        assert!(find_preset("0").is_none());
        assert!(find_preset("5").is_none());
        assert!(find_preset("lasagna").is_none());
        assert!(find_preset("  ").is_none());
    }
}
