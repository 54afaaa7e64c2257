use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    config::AppConfig,
    models::{AgeRating, Game, GameDetail, Requirements},
};

use super::error::CatalogError;

const GAMES_PATH: &str = "jogos";
const AGE_RATINGS_PATH: &str = "classificacoes";
const REQUIREMENTS_PATH: &str = "reqminimos";

/// Thin async client over the catalog REST endpoints.
///
/// Every endpoint returns a JSON array; single-record lookups use a query
/// filter and take the first element.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CatalogClient {
    /// Build a client from configuration.
    pub fn new(config: &AppConfig) -> Result<Self, CatalogError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(CatalogError::Client)?;
        Self::with_http(&config.api_base_url, http)
    }

    /// Build a client around an existing `reqwest` client.
    pub fn with_http(base_url: &str, http: reqwest::Client) -> Result<Self, CatalogError> {
        let normalized = format!("{}/", base_url.trim().trim_end_matches('/'));
        let base_url = Url::parse(&normalized).map_err(|err| CatalogError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;
        Ok(Self { http, base_url })
    }

    /// Base URL requests are resolved against.
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    /// Every game in the catalog.
    pub async fn games(&self) -> Result<Vec<Game>, CatalogError> {
        self.fetch_list(GAMES_PATH, &[]).await
    }

    /// A single game by id.
    pub async fn game(&self, id: &str) -> Result<Option<Game>, CatalogError> {
        self.fetch_first(GAMES_PATH, &[("CodJogo", id)]).await
    }

    /// Every age rating, in backend order.
    pub async fn age_ratings(&self) -> Result<Vec<AgeRating>, CatalogError> {
        self.fetch_list(AGE_RATINGS_PATH, &[]).await
    }

    /// A single age rating by code.
    pub async fn age_rating(&self, code: &str) -> Result<Option<AgeRating>, CatalogError> {
        self.fetch_first(AGE_RATINGS_PATH, &[("CodFaixaEtaria", code)])
            .await
    }

    /// Minimum requirements by id.
    pub async fn requirements(&self, id: &str) -> Result<Option<Requirements>, CatalogError> {
        self.fetch_first(REQUIREMENTS_PATH, &[("ReqMinId", id)]).await
    }

    /// Re-read `game` and fetch its age rating and requirements
    /// concurrently.
    ///
    /// A failed lookup is logged and reported as missing; the detail page
    /// renders without that section. When the game itself cannot be
    /// re-read, the listing copy is kept.
    pub async fn detail(&self, game: Game) -> GameDetail {
        let fresh = self.game(&game.id);
        let rating = async {
            match game.age_rating_code.as_deref() {
                Some(code) => self.age_rating(code).await,
                None => Ok(None),
            }
        };
        let requirements = async {
            match game.requirements_id.as_deref() {
                Some(id) => self.requirements(id).await,
                None => Ok(None),
            }
        };
        let (fresh, rating, requirements) = tokio::join!(fresh, rating, requirements);

        let age_rating = rating.unwrap_or_else(|err| {
            warn!(game_id = %game.id, error = %err, "Age rating lookup failed");
            None
        });
        let requirements = requirements.unwrap_or_else(|err| {
            warn!(game_id = %game.id, error = %err, "Requirements lookup failed");
            None
        });

        let game = match fresh {
            Ok(Some(fresh)) => fresh,
            Ok(None) => game,
            Err(err) => {
                warn!(game_id = %game.id, error = %err, "Game lookup failed");
                game
            }
        };

        GameDetail {
            game,
            age_rating,
            requirements,
        }
    }

    async fn fetch_first<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>, CatalogError> {
        let items: Vec<T> = self.fetch_list(path, query).await?;
        Ok(items.into_iter().next())
    }

    async fn fetch_list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, CatalogError> {
        let url = self.endpoint(path, query)?;
        debug!(%url, "Fetching catalog resource");

        let response = self
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|source| CatalogError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|source| CatalogError::Http {
            url: url.to_string(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| CatalogError::Decode {
            url: url.to_string(),
            source,
        })
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, CatalogError> {
        let mut url = self
            .base_url
            .join(path)
            .map_err(|err| CatalogError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
                reason: err.to_string(),
            })?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{client_for, serve};

    #[test]
    fn endpoints_keep_base_path() -> Result<(), CatalogError> {
        let http = reqwest::Client::new();
        let client = CatalogClient::with_http("http://store.test/api/", http.clone())?;
        assert_eq!(
            client.endpoint("jogos", &[("CodJogo", "7")])?.as_str(),
            "http://store.test/api/jogos?CodJogo=7"
        );

        let client = CatalogClient::with_http("http://store.test/api", http)?;
        assert_eq!(
            client.endpoint("classificacoes", &[])?.as_str(),
            "http://store.test/api/classificacoes"
        );
        Ok(())
    }

    #[test]
    fn rejects_invalid_base_url() {
        let result = CatalogClient::with_http("not a url", reqwest::Client::new());
        assert!(matches!(result, Err(CatalogError::InvalidUrl { .. })));
    }

    #[tokio::test]
    async fn fetches_games_and_single_records() -> anyhow::Result<()> {
        let addr = serve(vec![
            (
                "/jogos",
                200,
                r#"[{"CodJogo":1,"Nome":"Alpha","Preco":10.0,"Desconto":0},
                    {"CodJogo":2,"Nome":"Beta","Preco":0,"Desconto":0}]"#,
            ),
            (
                "/jogos?CodJogo=2",
                200,
                r#"[{"CodJogo":2,"Nome":"Beta","Preco":0,"Desconto":0}]"#,
            ),
            ("/jogos?CodJogo=9", 200, "[]"),
        ])
        .await;
        let client = client_for(addr);

        let games = client.games().await?;
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].name, "Alpha");

        let beta = client.game("2").await?;
        assert_eq!(beta.map(|game| game.name), Some("Beta".to_string()));
        assert!(client.game("9").await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn reports_status_and_decode_errors() {
        let addr = serve(vec![
            ("/jogos", 500, "oops"),
            ("/classificacoes", 200, "{not json"),
        ])
        .await;
        let client = client_for(addr);

        match client.games().await {
            Err(CatalogError::Status { status, .. }) => assert_eq!(status, 500),
            other => panic!("expected status error, got {other:?}"),
        }
        assert!(matches!(
            client.age_ratings().await,
            Err(CatalogError::Decode { .. })
        ));
    }

    #[tokio::test]
    async fn detail_tolerates_missing_lookups() -> anyhow::Result<()> {
        let addr = serve(vec![
            (
                "/classificacoes?CodFaixaEtaria=3",
                200,
                r#"[{"CodFaixaEtaria":3,"ClassificacaoIndicativa":"12 anos"}]"#,
            ),
            ("/reqminimos?ReqMinId=5", 500, "down"),
        ])
        .await;
        let client = client_for(addr);
        let game: Game = serde_json::from_str(
            r#"{"CodJogo":1,"Nome":"Alpha","Preco":10.0,"Desconto":0,"CodFaixaEtaria":3,"ReqMinId":5}"#,
        )?;

        let detail = client.detail(game).await;
        assert_eq!(
            detail.age_rating.and_then(|rating| rating.label),
            Some("12 anos".to_string())
        );
        assert!(detail.requirements.is_none());
        assert_eq!(detail.game.name, "Alpha");
        Ok(())
    }

    #[tokio::test]
    async fn detail_prefers_fresh_game_record() -> anyhow::Result<()> {
        let addr = serve(vec![
            (
                "/jogos?CodJogo=4",
                200,
                r#"[{"CodJogo":4,"Nome":"Delta","Preco":30.0,"Desconto":50,
                     "Descricao":"Full write-up","CodFaixaEtaria":1}]"#,
            ),
            (
                "/classificacoes?CodFaixaEtaria=1",
                200,
                r#"[{"CodFaixaEtaria":1,"ClassificacaoIndicativa":"Livre"}]"#,
            ),
        ])
        .await;
        let client = client_for(addr);
        let listed: Game = serde_json::from_str(
            r#"{"CodJogo":4,"Nome":"Delta","Preco":30.0,"Desconto":0,"CodFaixaEtaria":1}"#,
        )?;

        let detail = client.detail(listed).await;
        assert_eq!(detail.game.discount_percent, 50);
        assert_eq!(detail.game.description.as_deref(), Some("Full write-up"));
        assert_eq!(
            detail.age_rating.map(|rating| rating.display_label()),
            Some("Livre".to_string())
        );
        Ok(())
    }
}
