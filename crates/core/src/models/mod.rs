//! Shared domain models.
//!
//! Field names mirror the catalog backend's JSON (`CodJogo`, `Preco`, ...).
//! Identifiers arrive either as numbers or strings and are normalised to
//! strings on decode.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::pricing::apply_discount;

/// Anything with a base price and a percentage discount.
pub trait PricedItem {
    /// Base price before discount.
    fn price(&self) -> f64;
    /// Discount in percent, expected within `0..=100`.
    fn discount_percent(&self) -> u32;

    /// Price after applying the discount. Recomputed on every call.
    fn discounted_price(&self) -> f64 {
        apply_discount(self.price(), self.discount_percent())
    }

    /// Free items are excluded from price-based recommendations.
    fn is_free(&self) -> bool {
        self.price() == 0.0
    }
}

/// A game listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    /// Unique identifier.
    #[serde(rename = "CodJogo", deserialize_with = "id_from_any")]
    pub id: String,
    /// Display title.
    #[serde(rename = "Nome")]
    pub name: String,
    /// Base price.
    #[serde(rename = "Preco", default, deserialize_with = "null_as_default")]
    pub price: f64,
    /// Discount percentage.
    #[serde(rename = "Desconto", default, deserialize_with = "null_as_default")]
    pub discount_percent: u32,
    /// Foreign key into the age-rating table.
    #[serde(
        rename = "CodFaixaEtaria",
        default,
        deserialize_with = "optional_id_from_any"
    )]
    pub age_rating_code: Option<String>,
    /// Primary cover image.
    #[serde(rename = "ImageUrl", default)]
    pub image_url: Option<String>,
    /// Short description.
    #[serde(rename = "Sinopse", default)]
    pub synopsis: Option<String>,
    /// Long-form description shown on the detail page.
    #[serde(rename = "Descricao", default)]
    pub description: Option<String>,
    /// Average user score on a 0-5 scale.
    #[serde(rename = "Avaliacao", default)]
    pub rating: Option<f64>,
    /// Release date as sent by the backend.
    #[serde(rename = "DtLancamento", default)]
    pub release_date: Option<String>,
    /// Genre tags.
    #[serde(rename = "Generos", default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    /// Store categories.
    #[serde(rename = "Categorias", default, deserialize_with = "null_as_default")]
    pub categories: Vec<String>,
    /// Foreign key into the minimum-requirements table.
    #[serde(
        rename = "ReqMinId",
        default,
        deserialize_with = "optional_id_from_any"
    )]
    pub requirements_id: Option<String>,
    /// Remaining fields, including numbered gallery images (`ImageUrl2`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PricedItem for Game {
    fn price(&self) -> f64 {
        self.price
    }

    fn discount_percent(&self) -> u32 {
        self.discount_percent
    }
}

impl Game {
    /// Whether a discount badge should be shown.
    pub fn has_discount(&self) -> bool {
        self.discount_percent > 0
    }

    /// Gallery images: the cover first, then `ImageUrl2`, `ImageUrl3`, ...
    /// up to the first missing index.
    pub fn gallery(&self) -> Vec<String> {
        let mut images = Vec::new();
        if let Some(url) = non_empty(self.image_url.as_deref()) {
            images.push(url.to_string());
        }

        let numbered = self.numbered_images();
        let mut index = 2;
        while let Some(url) = numbered.get(&index) {
            images.push(url.to_string());
            index += 1;
        }
        images
    }

    /// Non-empty `ImageUrlN` entries keyed by `N`.
    fn numbered_images(&self) -> BTreeMap<usize, &str> {
        static IMAGE_KEY_RE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"^ImageUrl([1-9]\d*)$").expect("invalid image key regex"));
        self.extra
            .iter()
            .filter_map(|(key, value)| {
                let index = IMAGE_KEY_RE
                    .captures(key)?
                    .get(1)?
                    .as_str()
                    .parse::<usize>()
                    .ok()?;
                Some((index, non_empty(value.as_str())?))
            })
            .collect()
    }

    /// Release date parsed from `YYYY-MM-DD` or an RFC 3339 timestamp.
    pub fn release_day(&self) -> Option<NaiveDate> {
        let raw = self.release_date.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| {
                chrono::DateTime::parse_from_rfc3339(raw)
                    .ok()
                    .map(|dt| dt.date_naive())
            })
            .or_else(|| {
                raw.get(..10)
                    .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
            })
    }

    /// Case-insensitive match against name, genres and categories.
    /// `needle` must already be lowercase.
    pub fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self
                .genres
                .iter()
                .any(|genre| genre.to_lowercase().contains(needle))
            || self
                .categories
                .iter()
                .any(|category| category.to_lowercase().contains(needle))
    }
}

/// Age classification record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRating {
    /// Classification code referenced by [`Game::age_rating_code`].
    #[serde(rename = "CodFaixaEtaria", deserialize_with = "id_from_any")]
    pub code: String,
    /// Display label (e.g. `Livre`, `16 anos`).
    #[serde(rename = "ClassificacaoIndicativa", default)]
    pub label: Option<String>,
}

impl AgeRating {
    /// Label to show, falling back to the code.
    pub fn display_label(&self) -> String {
        non_empty(self.label.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| self.code.clone())
    }
}

/// Minimum system requirements for a game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requirements {
    /// Identifier referenced by [`Game::requirements_id`].
    #[serde(rename = "ReqMinId", default, deserialize_with = "optional_id_from_any")]
    pub id: Option<String>,
    /// Operating system.
    #[serde(rename = "SOMin", default)]
    pub os: Option<String>,
    /// Processor.
    #[serde(rename = "CPUMin", default)]
    pub cpu: Option<String>,
    /// Memory.
    #[serde(rename = "RAMmin", default)]
    pub memory: Option<String>,
    /// Graphics card.
    #[serde(rename = "GPUMin", default)]
    pub gpu: Option<String>,
    /// Disk space.
    #[serde(rename = "Armazenamento", default)]
    pub storage: Option<String>,
    /// DirectX version.
    #[serde(rename = "DirectXMin", default)]
    pub directx: Option<String>,
    /// Free-form remarks.
    #[serde(rename = "OBS", default)]
    pub notes: Option<String>,
}

/// A game together with the records fetched for its detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct GameDetail {
    /// The game itself.
    pub game: Game,
    /// Its age rating, when the lookup succeeded.
    pub age_rating: Option<AgeRating>,
    /// Its minimum requirements, when the lookup succeeded.
    pub requirements: Option<Requirements>,
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn value_to_id(value: Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(Some(&text)).map(str::to_string),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn id_from_any<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let rendered = value.to_string();
    value_to_id(value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid identifier {rendered}")))
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn optional_id_from_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_id(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Game {
        serde_json::from_value(json!({
            "CodJogo": 7,
            "Nome": "Hollow Night",
            "Preco": 49.9,
            "Desconto": 20,
            "CodFaixaEtaria": "3",
            "Sinopse": "Descend into a ruined kingdom.",
            "Descricao": "A hand-drawn action adventure through a vast underground world.",
            "ImageUrl": "https://cdn.test/cover.png",
            "ImageUrl2": "https://cdn.test/2.png",
            "ImageUrl3": "https://cdn.test/3.png",
            "ImageUrl5": "https://cdn.test/5.png",
            "Generos": ["Metroidvania", "Indie"],
            "Categorias": ["Single-player"],
            "DtLancamento": "2017-02-24",
            "ReqMinId": 12
        }))
        .expect("sample game decodes")
    }

    #[test]
    fn decodes_backend_fields() {
        let game = sample();
        assert_eq!(game.id, "7");
        assert_eq!(game.age_rating_code.as_deref(), Some("3"));
        assert_eq!(game.requirements_id.as_deref(), Some("12"));
        assert_eq!(game.genres, vec!["Metroidvania", "Indie"]);
        assert!(game.has_discount());
        assert!((game.discounted_price() - 39.92).abs() < 1e-9);
        assert_eq!(game.synopsis.as_deref(), Some("Descend into a ruined kingdom."));
        assert_eq!(
            game.description.as_deref(),
            Some("A hand-drawn action adventure through a vast underground world.")
        );
        assert!(!game.extra.contains_key("Descricao"));
    }

    #[test]
    fn nulls_decode_as_defaults() {
        let games: Vec<Game> = serde_json::from_str(
            r#"[
                {"CodJogo":1,"Nome":"Alpha","Preco":20.0,"Desconto":null,"Generos":null,"Categorias":null},
                {"CodJogo":2,"Nome":"Beta","Preco":null,"Desconto":10,"Avaliacao":null,"Descricao":null},
                {"CodJogo":3,"Nome":"Gamma","Preco":15.0,"Desconto":0,"Generos":["RPG"]}
            ]"#,
        )
        .expect("list with nulls decodes");

        assert_eq!(games.len(), 3);
        assert_eq!(games[0].discount_percent, 0);
        assert!(games[0].genres.is_empty());
        assert!(games[0].categories.is_empty());
        assert!(!games[0].has_discount());
        assert_eq!(games[1].price, 0.0);
        assert!(games[1].is_free());
        assert_eq!(games[1].rating, None);
        assert_eq!(games[1].description, None);
        assert_eq!(games[2].genres, vec!["RPG"]);
    }

    #[test]
    fn gallery_stops_at_first_gap() {
        let game = sample();
        assert_eq!(
            game.gallery(),
            vec![
                "https://cdn.test/cover.png",
                "https://cdn.test/2.png",
                "https://cdn.test/3.png",
            ]
        );
    }

    #[test]
    fn gallery_ignores_unrelated_and_blank_keys() {
        let mut game = sample();
        game.extra.insert("ImageUrl4".to_string(), json!(""));
        game.extra.insert("ImageUrl5".to_string(), json!("https://cdn.test/5.png"));
        game.extra.insert("ImageUrlAlt".to_string(), json!("https://cdn.test/alt.png"));
        game.extra.insert("ImageUrl03".to_string(), json!("https://cdn.test/03.png"));
        assert_eq!(game.gallery().len(), 3);

        game.extra.insert("ImageUrl4".to_string(), json!("https://cdn.test/4.png"));
        assert_eq!(game.gallery().len(), 5);
    }

    #[test]
    fn gallery_skips_missing_cover() {
        let mut game = sample();
        game.image_url = Some("  ".to_string());
        let gallery = game.gallery();
        assert_eq!(gallery.len(), 2);
        assert_eq!(gallery[0], "https://cdn.test/2.png");
    }

    #[test]
    fn parses_release_dates() {
        let mut game = sample();
        assert_eq!(game.release_day(), NaiveDate::from_ymd_opt(2017, 2, 24));
        game.release_date = Some("2020-11-05T00:00:00Z".to_string());
        assert_eq!(game.release_day(), NaiveDate::from_ymd_opt(2020, 11, 5));
        game.release_date = Some("soon".to_string());
        assert_eq!(game.release_day(), None);
    }

    #[test]
    fn matches_name_genre_and_category() {
        let game = sample();
        assert!(game.matches("hollow"));
        assert!(game.matches("indie"));
        assert!(game.matches("single"));
        assert!(!game.matches("racing"));
    }

    #[test]
    fn age_rating_label_falls_back_to_code() {
        let rating: AgeRating =
            serde_json::from_value(json!({ "CodFaixaEtaria": 18 })).expect("rating decodes");
        assert_eq!(rating.display_label(), "18");
    }
}
