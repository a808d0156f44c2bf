//! Commodity catalog grouped by category.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// Category reported for names missing from the catalog
pub const UNKNOWN_CATEGORY: &str = "Unknown";

static CATEGORIES: [(&str, &[&str]); 12] = [
    (
        "Staple Grains",
        &[
            "Bajra", "Rice", "Wheat", "Maize", "Jowar", "Ragi", "Barley", "Sorghum", "Millet",
            "Amaranth",
        ],
    ),
    (
        "Vegetables",
        &[
            "Tomato",
            "Potato",
            "Onion",
            "Spinach",
            "Cauliflower",
            "Cabbage",
            "Brinjal",
            "Bitter Gourd",
            "Lady Finger",
            "Bottle Gourd",
            "Ridge Gourd",
            "Pumpkin",
        ],
    ),
    (
        "Fruits",
        &[
            "Mango",
            "Banana",
            "Papaya",
            "Orange",
            "Apple",
            "Grapes",
            "Guava",
            "Lychee",
            "Jackfruit",
            "Custard Apple",
            "Pomegranate",
            "Watermelon",
        ],
    ),
    (
        "Spices",
        &[
            "Garlic",
            "Ginger",
            "Turmeric",
            "Cardamom",
            "Cinnamon",
            "Clove",
            "Black Pepper",
            "Cumin",
            "Coriander",
            "Fenugreek",
        ],
    ),
    (
        "Pulses",
        &[
            "Chickpea",
            "Red Lentil",
            "Yellow Lentil",
            "Green Gram",
            "Black Gram",
            "Pigeon Pea",
            "Kidney Bean",
        ],
    ),
    (
        "Oilseeds",
        &[
            "Mustard",
            "Sesame",
            "Groundnut",
            "Sunflower",
            "Soybean",
            "Linseed",
            "Safflower",
            "Castor",
            "Coconut",
            "Palm",
        ],
    ),
    (
        "Cash Crops",
        &[
            "Cotton",
            "Sugarcane",
            "Jute",
            "Coffee",
            "Tea",
            "Tobacco",
            "Rubber",
            "Cocoa",
            "Indigo",
            "Opium",
        ],
    ),
    (
        "Nuts",
        &[
            "Almond",
            "Walnut",
            "Cashew",
            "Pistachio",
            "Peanut",
            "Hazelnut",
            "Pine Nut",
            "Chestnut",
            "Pecan",
            "Brazil Nut",
        ],
    ),
    (
        "Medicinal",
        &[
            "Aloe Vera",
            "Ashwagandha",
            "Neem",
            "Tulsi",
            "Lemongrass",
            "Mint",
            "Stevia",
            "Saffron",
            "Moringa",
            "Brahmi",
        ],
    ),
    (
        "Root Crops",
        &[
            "Sweet Potato",
            "Yam",
            "Taro",
            "Cassava",
            "Beet",
            "Radish",
            "Turnip",
            "Carrot",
            "Ginger Root",
            "Horseradish",
        ],
    ),
    (
        "Berries",
        &[
            "Strawberry",
            "Mulberry",
            "Gooseberry",
            "Jamun",
            "Karonda",
            "Cranberry",
            "Blueberry",
            "Blackberry",
            "Raspberry",
            "Falsa",
        ],
    ),
    (
        "Ornamentals",
        &[
            "Rose",
            "Marigold",
            "Jasmine",
            "Chrysanthemum",
            "Orchid",
            "Gladiolus",
            "Lily",
            "Dahlia",
            "Aster",
            "Balsam",
        ],
    ),
];

// lower-cased commodity name -> category
static CATEGORY_INDEX: Lazy<HashMap<String, &'static str>> = Lazy::new(|| {
    CATEGORIES
        .iter()
        .flat_map(|(category, names)| {
            names
                .iter()
                .map(move |name| (name.to_lowercase(), *category))
        })
        .collect()
});

/// One catalog category with its commodities, in catalog order
#[derive(Debug, Clone, Serialize)]
pub struct CommodityCategory {
    pub category: &'static str,
    pub commodities: &'static [&'static str],
}

pub fn categories() -> Vec<CommodityCategory> {
    CATEGORIES
        .iter()
        .map(|(category, commodities)| CommodityCategory {
            category: *category,
            commodities: *commodities,
        })
        .collect()
}

/// Case-insensitive category lookup. Unlisted names map to [`UNKNOWN_CATEGORY`].
pub fn category_for(commodity: &str) -> &'static str {
    CATEGORY_INDEX
        .get(&super::reference_tables::normalize_commodity(commodity))
        .copied()
        .unwrap_or(UNKNOWN_CATEGORY)
}

pub fn commodity_count() -> usize {
    CATEGORY_INDEX.len()
}
