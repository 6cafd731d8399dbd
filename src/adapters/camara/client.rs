//! Câmara dos Deputados web service client. Implements BillFeed.
//!
//! Talks to the legacy SitCamaraWS `Proposicoes.asmx` endpoints, which answer with XML.

use crate::adapters::camara::xml::{bill_from_xml, bills_from_xml};
use crate::domain::{Bill, DomainError};
use crate::ports::BillFeed;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};

/// HTTP adapter for the chamber's bill endpoints.
pub struct CamaraClient {
    client: Client,
    base_url: String,
}

impl CamaraClient {
    /// Create a client for `base_url` (e.g. `https://www.camara.leg.br/SitCamaraWS/Proposicoes.asmx`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DomainError::Http(format!("build client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn list_url(&self) -> String {
        format!("{}/ListarProposicoes", self.base_url)
    }

    fn by_id_url(&self) -> String {
        format!("{}/ObterProposicaoPorID", self.base_url)
    }

    async fn get_xml(&self, url: &str, query: &[(&str, String)]) -> Result<String, DomainError> {
        debug!(url, "requesting Câmara feed");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| DomainError::Http(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, url, "Câmara API returned error");
            return Err(DomainError::Http(format!(
                "Câmara API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DomainError::Http(format!("Failed to read response body: {}", e)))
    }
}

/// Query string of `ListarProposicoes`. The service rejects requests missing any key,
/// so unused filters are sent empty.
fn list_query(sigla: &str, year: i32) -> Vec<(&'static str, String)> {
    vec![
        ("sigla", sigla.to_string()),
        ("numero", String::new()),
        ("ano", year.to_string()),
        ("datApresentacaoIni", String::new()),
        ("datApresentacaoFim", String::new()),
        ("parteNomeAutor", String::new()),
        ("idTipoAutor", String::new()),
        ("siglaPartidoAutor", String::new()),
        ("siglaUFAutor", String::new()),
        ("generoAutor", String::new()),
        ("codEstado", String::new()),
        ("codOrgaoEstado", String::new()),
        ("emTramitacao", String::new()),
    ]
}

#[async_trait::async_trait]
impl BillFeed for CamaraClient {
    async fn list_bills(&self, sigla: &str, year: i32) -> Result<Vec<Bill>, DomainError> {
        let body = self.get_xml(&self.list_url(), &list_query(sigla, year)).await?;
        let bills = bills_from_xml(Some(&body))?;
        info!(sigla, year, count = bills.len(), "fetched bills from Câmara");
        Ok(bills)
    }

    async fn bill_by_camara_id(&self, camara_id: i64) -> Result<Option<Bill>, DomainError> {
        let body = self
            .get_xml(&self.by_id_url(), &[("IdProp", camara_id.to_string())])
            .await?;
        bill_from_xml(Some(&body))
    }
}
