//! Bill (proposição) lookups and Câmara feed import.
//!
//! - Local reads go straight to BillRepo
//! - Import fetches the chamber's list, then inserts only unseen `camara_id`s
//! - Single-bill lookups fall back to the feed and cache the result locally,
//!   always under the requested `camara_id`

use crate::adapters::camara::xml;
use crate::domain::{Bill, DomainError};
use crate::ports::{BillFeed, BillRepo};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct BillService {
    repo: Arc<dyn BillRepo>,
    feed: Arc<dyn BillFeed>,
}

impl BillService {
    pub fn new(repo: Arc<dyn BillRepo>, feed: Arc<dyn BillFeed>) -> Self {
        Self { repo, feed }
    }

    pub async fn get_all(&self) -> Result<Vec<Bill>, DomainError> {
        self.repo.all_bills().await
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<Bill>, DomainError> {
        self.repo.bill_by_id(id).await
    }

    pub async fn delete(&self, id: i64) -> Result<(), DomainError> {
        self.repo.delete_bill(id).await?;
        info!(bill_id = id, "bill deleted");
        Ok(())
    }

    /// Re-fetch a stored bill from the Câmara and overwrite its name and description.
    /// `None` when the bill is not stored or the feed no longer has it.
    pub async fn refresh(&self, id: i64) -> Result<Option<Bill>, DomainError> {
        let Some(mut bill) = self.repo.bill_by_id(id).await? else {
            return Ok(None);
        };
        let Some(fresh) = self.feed.bill_by_camara_id(bill.camara_id).await? else {
            info!(camara_id = bill.camara_id, "bill not found in Câmara feed");
            return Ok(None);
        };
        bill.name = fresh.name;
        bill.description = fresh.description;
        self.repo.update_bill(&bill).await?;
        info!(bill_id = id, camara_id = bill.camara_id, "bill refreshed");
        Ok(Some(bill))
    }

    pub async fn get_by_camara_id(&self, camara_id: i64) -> Result<Option<Bill>, DomainError> {
        self.repo.bill_by_camara_id(camara_id).await
    }

    /// Every bill in a Câmara XML payload. Empty for `None` or blank content.
    pub fn list_from_xml(&self, content: Option<&str>) -> Result<Vec<Bill>, DomainError> {
        xml::bills_from_xml(content)
    }

    /// Last bill in a Câmara XML payload.
    pub fn get_from_xml(&self, content: Option<&str>) -> Result<Option<Bill>, DomainError> {
        xml::bill_from_xml(content)
    }

    /// Fetch bills of type `sigla` from `year` and store the ones not yet known.
    pub async fn import(&self, sigla: &str, year: i32) -> Result<ImportStats, DomainError> {
        let bills = self.feed.list_bills(sigla, year).await?;
        let mut stats = ImportStats {
            fetched: bills.len(),
            ..ImportStats::default()
        };

        // The feed may list the same bill twice; only the first copy counts.
        let mut seen = HashSet::new();
        for mut bill in bills {
            if !seen.insert(bill.camara_id)
                || self.repo.bill_by_camara_id(bill.camara_id).await?.is_some()
            {
                stats.skipped += 1;
                continue;
            }
            bill.id = Some(self.repo.insert_bill(&bill).await?);
            debug!(camara_id = bill.camara_id, name = %bill.name, "stored bill");
            stats.inserted += 1;
        }

        info!(
            sigla,
            year,
            fetched = stats.fetched,
            inserted = stats.inserted,
            skipped = stats.skipped,
            "imported bills"
        );
        Ok(stats)
    }

    /// Local bill for `camara_id`, fetching and storing it from the Câmara when missing.
    pub async fn fetch_by_camara_id(&self, camara_id: i64) -> Result<Option<Bill>, DomainError> {
        if let Some(bill) = self.repo.bill_by_camara_id(camara_id).await? {
            return Ok(Some(bill));
        }

        let Some(mut bill) = self.feed.bill_by_camara_id(camara_id).await? else {
            info!(camara_id, "bill not found in Câmara feed");
            return Ok(None);
        };
        if bill.camara_id != 0 && bill.camara_id != camara_id {
            warn!(
                requested = camara_id,
                returned = bill.camara_id,
                "Câmara returned a different idProposicao"
            );
        }
        bill.camara_id = camara_id;
        bill.id = Some(self.repo.insert_bill(&bill).await?);
        info!(camara_id, name = %bill.name, "bill fetched from Câmara");
        Ok(Some(bill))
    }
}

/// Result of a feed import.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub fetched: usize,
    pub inserted: usize,
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::sqlite_repo::SqliteRepo;
    use std::sync::Mutex;

    /// Feed serving canned XML, recording the requests it received.
    struct FakeFeed {
        list_xml: String,
        single_xml: Option<String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFeed {
        fn new(list_xml: &str, single_xml: Option<&str>) -> Self {
            Self {
                list_xml: list_xml.to_string(),
                single_xml: single_xml.map(String::from),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl BillFeed for FakeFeed {
        async fn list_bills(&self, sigla: &str, year: i32) -> Result<Vec<Bill>, DomainError> {
            self.calls.lock().unwrap().push(format!("list {} {}", sigla, year));
            xml::bills_from_xml(Some(&self.list_xml))
        }

        async fn bill_by_camara_id(&self, camara_id: i64) -> Result<Option<Bill>, DomainError> {
            self.calls.lock().unwrap().push(format!("get {}", camara_id));
            xml::bill_from_xml(self.single_xml.as_deref())
        }
    }

    const LIST: &str = r#"<proposicoes>
        <proposicao><nomeProposicao>PL 1/2013</nomeProposicao><idProposicao>10</idProposicao><Ementa>Um</Ementa></proposicao>
        <proposicao><nomeProposicao>PL 2/2013</nomeProposicao><idProposicao>20</idProposicao><Ementa>Dois</Ementa></proposicao>
        <proposicao><nomeProposicao>PL 2/2013</nomeProposicao><idProposicao>20</idProposicao><Ementa>Dois</Ementa></proposicao>
    </proposicoes>"#;

    async fn service(feed: FakeFeed) -> (tempfile::TempDir, Arc<FakeFeed>, BillService) {
        let dir = tempfile::tempdir().unwrap();
        let repo = Arc::new(SqliteRepo::connect(dir.path()).await.unwrap());
        let feed = Arc::new(feed);
        let svc = BillService::new(repo, Arc::clone(&feed) as Arc<dyn BillFeed>);
        (dir, feed, svc)
    }

    #[tokio::test]
    async fn test_import_skips_known_bills() {
        let (_dir, feed, svc) = service(FakeFeed::new(LIST, None)).await;

        let first = svc.import("PL", 2013).await.unwrap();
        assert_eq!(
            first,
            ImportStats {
                fetched: 3,
                inserted: 2,
                skipped: 1
            }
        );

        let second = svc.import("PL", 2013).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 3);

        let all = svc.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(
            svc.get_by_camara_id(20).await.unwrap().unwrap().description,
            "Dois"
        );
        assert_eq!(
            feed.calls.lock().unwrap().as_slice(),
            ["list PL 2013", "list PL 2013"]
        );
    }

    #[tokio::test]
    async fn test_fetch_by_camara_id_caches_locally() {
        let single = r#"<proposicao><nomeProposicao>PEC 37/2011</nomeProposicao><idProposicao>507965</idProposicao><Ementa>Poder de investigação</Ementa></proposicao>"#;
        let (_dir, feed, svc) = service(FakeFeed::new("<proposicoes/>", Some(single))).await;

        let bill = svc.fetch_by_camara_id(507965).await.unwrap().unwrap();
        assert!(bill.id.is_some());
        assert_eq!(bill.name, "PEC 37/2011");

        let again = svc.fetch_by_camara_id(507965).await.unwrap().unwrap();
        assert_eq!(again, bill);
        assert_eq!(feed.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_stores_under_requested_id() {
        let single = r#"<proposicao><nomeProposicao>PL 9/2013</nomeProposicao><idProposicao>999</idProposicao></proposicao>"#;
        let (_dir, feed, svc) = service(FakeFeed::new("<proposicoes/>", Some(single))).await;

        let bill = svc.fetch_by_camara_id(42).await.unwrap().unwrap();
        assert_eq!(bill.camara_id, 42);
        svc.fetch_by_camara_id(42).await.unwrap().unwrap();

        assert_eq!(svc.get_all().await.unwrap().len(), 1);
        assert_eq!(feed.calls.lock().unwrap().as_slice(), ["get 42"]);
    }

    #[tokio::test]
    async fn test_refresh_and_delete() {
        let single = r#"<proposicao><nomeProposicao>PL 1/2013</nomeProposicao><idProposicao>10</idProposicao><Ementa>Um (revisto)</Ementa></proposicao>"#;
        let (_dir, _feed, svc) = service(FakeFeed::new(LIST, Some(single))).await;
        svc.import("PL", 2013).await.unwrap();
        let id = svc.get_by_camara_id(10).await.unwrap().unwrap().id.unwrap();

        let refreshed = svc.refresh(id).await.unwrap().unwrap();
        assert_eq!(refreshed.description, "Um (revisto)");
        assert_eq!(svc.get_by_id(id).await.unwrap(), Some(refreshed));

        svc.delete(id).await.unwrap();
        assert!(svc.get_by_id(id).await.unwrap().is_none());
        assert!(svc.refresh(id).await.unwrap().is_none());
        assert_eq!(svc.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fetch_by_camara_id_missing() {
        let (_dir, _feed, svc) = service(FakeFeed::new("<proposicoes/>", None)).await;
        assert!(svc.fetch_by_camara_id(1).await.unwrap().is_none());
        assert!(svc.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_xml_helpers() {
        let (_dir, _feed, svc) = service(FakeFeed::new("<proposicoes/>", None)).await;
        assert!(svc.list_from_xml(None).unwrap().is_empty());
        let last = svc.get_from_xml(Some(LIST)).unwrap().unwrap();
        assert_eq!(last.camara_id, 20);
        assert!(matches!(
            svc.list_from_xml(Some("<broken>")),
            Err(DomainError::Feed(_))
        ));
    }
}
