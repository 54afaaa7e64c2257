use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;

use super::{client::CatalogClient, store::CatalogSnapshot};

/// Events emitted by the async catalog fetcher.
#[derive(Debug)]
pub enum SyncEvent {
    /// Fetch succeeded with a fresh snapshot.
    Success {
        /// Games and age ratings as returned by the backend.
        snapshot: CatalogSnapshot,
    },
    /// Fetch failed with an error.
    Error(anyhow::Error),
}

/// Coordinates fetching the catalog from the backend.
#[derive(Debug, Clone)]
pub struct CatalogSync {
    client: CatalogClient,
}

impl CatalogSync {
    /// Create a new fetcher around a client.
    pub fn new(client: CatalogClient) -> Self {
        Self { client }
    }

    /// Client used for requests.
    pub fn client(&self) -> &CatalogClient {
        &self.client
    }

    /// Fetch games and age ratings concurrently into one snapshot.
    pub async fn fetch(&self) -> Result<CatalogSnapshot> {
        let (games, age_ratings) = tokio::try_join!(self.client.games(), self.client.age_ratings())
            .with_context(|| format!("failed to fetch catalog from {}", self.client.base_url()))?;

        info!(
            games = games.len(),
            age_ratings = age_ratings.len(),
            source = self.client.base_url(),
            "Catalog fetched"
        );
        Ok(CatalogSnapshot {
            games,
            age_ratings,
            fetched_at: Some(Utc::now()),
            source: self.client.base_url().to_string(),
        })
    }

    /// Fetch once and report the outcome on `sender`.
    pub async fn run(self, sender: mpsc::Sender<SyncEvent>) -> Result<()> {
        match self.fetch().await {
            Ok(snapshot) => {
                sender
                    .send(SyncEvent::Success { snapshot })
                    .await
                    .context("failed to send sync success event")?;
            }
            Err(err) => {
                let _ = sender.send(SyncEvent::Error(err)).await;
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::{client_for, serve};

    #[tokio::test]
    async fn run_reports_snapshot() -> Result<()> {
        let addr = serve(vec![
            (
                "/jogos",
                200,
                r#"[{"CodJogo":1,"Nome":"Alpha","Preco":10.0,"Desconto":0,"CodFaixaEtaria":1}]"#,
            ),
            (
                "/classificacoes",
                200,
                r#"[{"CodFaixaEtaria":1,"ClassificacaoIndicativa":"Livre"}]"#,
            ),
        ])
        .await;
        let (tx, mut rx) = mpsc::channel(1);
        CatalogSync::new(client_for(addr)).run(tx).await?;

        match rx.recv().await {
            Some(SyncEvent::Success { snapshot }) => {
                assert_eq!(snapshot.games.len(), 1);
                assert_eq!(snapshot.age_ratings.len(), 1);
                assert!(snapshot.fetched_at.is_some());
            }
            other => panic!("expected success, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn run_reports_failure_without_erroring() -> Result<()> {
        let addr = serve(vec![("/jogos", 200, "[]")]).await;
        let (tx, mut rx) = mpsc::channel(1);
        CatalogSync::new(client_for(addr)).run(tx).await?;

        assert!(matches!(rx.recv().await, Some(SyncEvent::Error(_))));
        Ok(())
    }
}
