//! Search service: indexing, search and dependents resolution.
//!
//! The service owns no mutable state. It validates requests, talks to the
//! injected [`IndexSink`] and [`MetadataStore`] and assembles responses.
//! Cancellation is checked before and after every await point.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use futures_util::future::try_join_all;
use log::debug;
use tokio_util::sync::CancellationToken;

use super::dependents::{apply_listed_state, distinct_ids, resolve_dependents};
use super::ranking::sort_hits;
use crate::config::SearchConfig;
use crate::domain::model::{
    DependentsRequest, DependentsResponse, IndexDocument, Package, PackageId, Page, SearchRequest,
    SearchResponse, SearchResult, normalize_filter,
};
use crate::error::SearchError;
use crate::index::{IndexQuery, IndexSink, QueryHit};
use crate::metadata::MetadataStore;

pub struct SearchService {
    index: Arc<dyn IndexSink>,
    metadata: Arc<dyn MetadataStore>,
    config: SearchConfig,
}

fn ensure_active(token: &CancellationToken) -> Result<(), SearchError> {
    if token.is_cancelled() {
        Err(SearchError::Cancelled)
    } else {
        Ok(())
    }
}

/// Await a read, giving up as soon as the token is cancelled.
async fn cancellable<T, F>(token: &CancellationToken, future: F) -> Result<T, SearchError>
where
    F: Future<Output = T>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(SearchError::Cancelled),
        output = future => Ok(output),
    }
}

impl From<QueryHit> for SearchResult {
    fn from(hit: QueryHit) -> Self {
        let document = hit.document;
        SearchResult {
            id: document.id,
            version: document.version,
            title: document.title,
            description: document.description,
            authors: document.authors,
            tags: document.tags,
            package_types: document.package_types,
            frameworks: document.frameworks,
            versions: hit.versions,
        }
    }
}

impl SearchService {
    pub fn new(
        index: Arc<dyn IndexSink>,
        metadata: Arc<dyn MetadataStore>,
        config: SearchConfig,
    ) -> Self {
        Self {
            index,
            metadata,
            config,
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Build the index document for `package` and upsert it.
    ///
    /// A cancelled call writes nothing. Sink failures are returned as
    /// [`SearchError::IndexingFailure`] and are not retried.
    #[tracing::instrument(skip(self, package, token), fields(id = %package.id, version = %package.version))]
    pub async fn index(
        &self,
        package: &Package,
        token: &CancellationToken,
    ) -> Result<IndexDocument, SearchError> {
        ensure_active(token)?;
        if package.id.is_blank() {
            return Err(SearchError::validation("Package id must not be empty"));
        }

        let document = IndexDocument::from_package(package);

        // Last chance to back out: the upsert below is one atomic write and
        // is never raced against the token.
        ensure_active(token)?;
        self.index
            .upsert(document.clone())
            .await
            .map_err(SearchError::IndexingFailure)?;

        if token.is_cancelled() {
            debug!("Cancellation requested after the document was committed");
        }
        Ok(document)
    }

    /// Run a filtered, paged search.
    #[tracing::instrument(skip(self, token))]
    pub async fn search(
        &self,
        request: SearchRequest,
        token: &CancellationToken,
    ) -> Result<SearchResponse, SearchError> {
        ensure_active(token)?;

        if request.query.chars().count() > self.config.max_query_length {
            return Err(SearchError::validation(format!(
                "Query exceeds {} characters",
                self.config.max_query_length
            )));
        }

        let page = Page::clamp(request.skip, request.take, self.config.max_page_size);
        let query = IndexQuery {
            terms: IndexQuery::terms_from(&request.query),
            include_prerelease: request.include_prerelease,
            include_semver2: request.include_semver2,
            include_unlisted: false,
            package_type: normalize_filter(request.package_type.as_deref()),
            framework: normalize_filter(request.framework.as_deref()),
            skip: page.skip,
            take: page.take,
        };

        let result = cancellable(token, self.index.query(&query))
            .await?
            .map_err(SearchError::SearchUnavailable)?;
        ensure_active(token)?;

        if result.total_hits < result.hits.len() {
            return Err(SearchError::SearchUnavailable(anyhow!(
                "Index returned {} hits but reported a total of {}",
                result.hits.len(),
                result.total_hits
            )));
        }
        let total_hits = result.total_hits;

        let mut hits = result.hits;
        sort_hits(&mut hits);
        hits.truncate(page.take);

        debug!(
            "Search {:?} returned {} of {} hits",
            request.query,
            hits.len(),
            total_hits
        );

        Ok(SearchResponse {
            total_hits,
            data: hits.into_iter().map(SearchResult::from).collect(),
        })
    }

    /// Find the packages depending on `request.package_id`, one entry per
    /// dependent id.
    #[tracing::instrument(skip(self, token))]
    pub async fn find_dependents(
        &self,
        request: DependentsRequest,
        token: &CancellationToken,
    ) -> Result<DependentsResponse, SearchError> {
        ensure_active(token)?;

        let target = PackageId::new(request.package_id.as_str());
        if target.is_blank() {
            return Err(SearchError::validation("Package id must not be empty"));
        }
        let page = Page::clamp(request.skip, request.take, self.config.max_page_size);

        let mut entries = cancellable(token, self.index.reverse_dependencies(&target))
            .await?
            .map_err(SearchError::SearchUnavailable)?;
        ensure_active(token)?;

        if entries.is_empty() {
            return Ok(DependentsResponse::default());
        }

        let ids = distinct_ids(&entries);
        let lookups = ids.iter().map(|id| self.metadata.get_versions(id));
        let versions = cancellable(token, try_join_all(lookups))
            .await?
            .map_err(SearchError::MetadataUnavailable)?;
        ensure_active(token)?;

        let records: HashMap<PackageId, _> = ids.into_iter().zip(versions).collect();
        apply_listed_state(&mut entries, &records);

        let dependents = resolve_dependents(&target, entries);
        let total_hits = dependents.len();
        debug!("{} has {} dependent package(s)", target, total_hits);

        Ok(DependentsResponse {
            total_hits,
            data: page.slice(dependents),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{Dependency, DependencyGroup, PackageVersion};
    use crate::index::{IndexQuery, MemoryIndex, MockIndexSink, QueryResult, ReverseDependency};
    use crate::metadata::{MemoryMetadataStore, MockMetadataStore, VersionRecord};
    use anyhow::anyhow;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;
    use tokio::time::timeout;

    fn package(id: &str, version: &str) -> Package {
        Package::new(id, PackageVersion::parse(version).unwrap())
    }

    fn with_dependency(mut pkg: Package, target: &str) -> Package {
        pkg.dependency_groups.push(DependencyGroup {
            target_framework: Some("net8.0".into()),
            dependencies: vec![Dependency {
                id: PackageId::new(target),
                range: "[1.0.0, )".into(),
            }],
        });
        pkg
    }

    struct Fixture {
        service: SearchService,
        metadata: Arc<MemoryMetadataStore>,
        index: Arc<MemoryIndex>,
    }

    impl Fixture {
        fn new() -> Self {
            let index = Arc::new(MemoryIndex::new());
            let metadata = Arc::new(MemoryMetadataStore::new());
            let service = SearchService::new(
                index.clone(),
                metadata.clone(),
                SearchConfig::default(),
            );
            Self {
                service,
                metadata,
                index,
            }
        }

        async fn publish(&self, packages: Vec<Package>) {
            let token = CancellationToken::new();
            for pkg in packages {
                self.metadata.put(pkg.clone()).await.unwrap();
                self.service.index(&pkg, &token).await.unwrap();
            }
        }
    }

    fn ids(response: &SearchResponse) -> Vec<String> {
        response.data.iter().map(|r| r.id.to_string()).collect()
    }

    #[test_log::test(tokio::test)]
    async fn test_search_paging_end_to_end() {
        let fixture = Fixture::new();
        fixture
            .publish((0..25).map(|i| package(&format!("Pkg{:02}", i), "1.0.0")).collect())
            .await;

        let request = SearchRequest::default().with_paging(20, 10);
        let response = fixture
            .service
            .search(request, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.total_hits, 25);
        assert_eq!(response.data.len(), 5);
        assert_eq!(ids(&response), vec!["Pkg20", "Pkg21", "Pkg22", "Pkg23", "Pkg24"]);
    }

    #[tokio::test]
    async fn test_search_clamps_take() {
        let fixture = Fixture::new();
        fixture
            .publish((0..150).map(|i| package(&format!("p{:03}", i), "1.0.0")).collect())
            .await;
        let token = CancellationToken::new();

        let response = fixture
            .service
            .search(SearchRequest::default().with_paging(-5, 10_000), &token)
            .await
            .unwrap();
        assert_eq!(response.data.len(), 100);
        assert_eq!(response.total_hits, 150);

        let response = fixture
            .service
            .search(SearchRequest::default().with_paging(0, 0), &token)
            .await
            .unwrap();
        assert_eq!(response.data.len(), 1);
        assert_eq!(ids(&response), vec!["p000"]);
    }

    #[tokio::test]
    async fn test_search_is_deterministic() {
        let fixture = Fixture::new();
        fixture
            .publish(vec![
                package("Gamma", "1.0.0"),
                package("alpha", "1.0.0"),
                package("Beta", "2.0.0"),
                package("beta", "1.0.0"),
            ])
            .await;
        let token = CancellationToken::new();

        let first = fixture.service.search(SearchRequest::default(), &token).await.unwrap();
        let second = fixture.service.search(SearchRequest::default(), &token).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(ids(&first), vec!["alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn test_search_filters_are_conjunctive_and_relax_monotonically() {
        let fixture = Fixture::new();
        let mut both = package("Both", "1.0.0");
        both.package_types = vec!["Tool".into()];
        both.frameworks = vec!["net8.0".into()];
        let mut type_only = package("TypeOnly", "1.0.0");
        type_only.package_types = vec!["Tool".into()];
        type_only.frameworks = vec!["net6.0".into()];
        let mut framework_only = package("FrameworkOnly", "1.0.0");
        framework_only.package_types = vec!["Dependency".into()];
        framework_only.frameworks = vec!["NET8.0".into()];
        fixture.publish(vec![both, type_only, framework_only]).await;
        let token = CancellationToken::new();

        let combined = fixture
            .service
            .search(
                SearchRequest::default().with_package_type("TOOL").with_framework("net8.0"),
                &token,
            )
            .await
            .unwrap();
        assert_eq!(ids(&combined), vec!["Both"]);

        let type_only = fixture
            .service
            .search(SearchRequest::default().with_package_type("tool"), &token)
            .await
            .unwrap();
        assert_eq!(ids(&type_only), vec!["Both", "TypeOnly"]);

        let framework_only = fixture
            .service
            .search(SearchRequest::default().with_framework("Net8.0"), &token)
            .await
            .unwrap();
        assert_eq!(ids(&framework_only), vec!["Both", "FrameworkOnly"]);

        for relaxed in [&type_only, &framework_only] {
            assert!(relaxed.total_hits >= combined.total_hits);
        }
    }

    #[tokio::test]
    async fn test_search_blank_filter_is_no_filter() {
        let fixture = Fixture::new();
        fixture.publish(vec![package("A", "1.0.0")]).await;

        let response = fixture
            .service
            .search(
                SearchRequest::default().with_package_type("  ").with_framework(""),
                &CancellationToken::new(),
            )
            .await
            .unwrap();
        assert_eq!(response.total_hits, 1);
    }

    #[tokio::test]
    async fn test_search_excludes_unlisted() {
        let fixture = Fixture::new();
        let mut hidden = package("Hidden", "1.0.0");
        hidden.listed = false;
        fixture.publish(vec![hidden, package("Shown", "1.0.0")]).await;

        let response = fixture
            .service
            .search(SearchRequest::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&response), vec!["Shown"]);
    }

    #[tokio::test]
    async fn test_search_rejects_overlong_query() {
        let fixture = Fixture::new();
        let request = SearchRequest::default().with_query("x".repeat(300));

        let result = fixture.service.search(request, &CancellationToken::new()).await;
        assert!(matches!(result, Err(SearchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_sink_failure_is_unavailable() {
        let mut index = MockIndexSink::new();
        index
            .expect_query()
            .times(1)
            .returning(|_| Err(anyhow!("connection refused")));
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );

        let result = service
            .search(SearchRequest::default(), &CancellationToken::new())
            .await;
        match result {
            Err(SearchError::SearchUnavailable(e)) => {
                assert!(e.to_string().contains("connection refused"))
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_search_passes_combined_predicate_to_sink() {
        let mut index = MockIndexSink::new();
        index
            .expect_query()
            .withf(|q| {
                q.terms == vec!["json".to_string()]
                    && q.include_prerelease
                    && !q.include_semver2
                    && !q.include_unlisted
                    && q.package_type.as_deref() == Some("tool")
                    && q.framework.as_deref() == Some("net8.0")
                    && q.skip == 3
                    && q.take == 7
            })
            .times(1)
            .returning(|_| Ok(QueryResult::default()));
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );

        let mut request = SearchRequest::default()
            .with_query("JSON")
            .with_paging(3, 7)
            .with_package_type("Tool")
            .with_framework("NET8.0");
        request.include_prerelease = true;

        let response = service.search(request, &CancellationToken::new()).await.unwrap();
        assert_eq!(response, SearchResponse::default());
    }

    #[tokio::test]
    async fn test_search_reorders_and_truncates_sink_page() {
        let mut index = MockIndexSink::new();
        index.expect_query().returning(|_| {
            let hit = |id: &str, score: f64| {
                let document = IndexDocument::from_package(&package(id, "1.0.0"));
                QueryHit {
                    versions: vec![document.version.clone()],
                    document,
                    score,
                }
            };
            Ok(QueryResult {
                hits: vec![hit("b", 1.0), hit("a", 1.0), hit("c", 9.0)],
                total_hits: 3,
            })
        });
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );

        let response = service
            .search(SearchRequest::default().with_paging(0, 2), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ids(&response), vec!["c", "a"]);
        assert_eq!(response.total_hits, 3);
    }

    #[tokio::test]
    async fn test_search_cancelled_before_io() {
        let mut index = MockIndexSink::new();
        index.expect_query().never();
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );
        let token = CancellationToken::new();
        token.cancel();

        let result = service.search(SearchRequest::default(), &token).await;
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_index_twice_is_idempotent() {
        let fixture = Fixture::new();
        let mut pkg = package("Json.Fast", "1.0.0");
        pkg.description = Some("fast json".into());
        fixture.publish(vec![pkg.clone()]).await;
        let token = CancellationToken::new();
        let request = SearchRequest::default().with_query("json");

        let before = fixture.service.search(request.clone(), &token).await.unwrap();
        fixture.service.index(&pkg, &token).await.unwrap();
        let after = fixture.service.search(request, &token).await.unwrap();

        assert_eq!(before, after);
        assert_eq!(after.total_hits, 1);
        assert_eq!(fixture.index.len(), 1);
    }

    #[tokio::test]
    async fn test_index_replaces_on_unlist() {
        let fixture = Fixture::new();
        let mut pkg = package("Foo", "1.0.0");
        fixture.publish(vec![pkg.clone()]).await;
        let token = CancellationToken::new();

        pkg.listed = false;
        fixture.service.index(&pkg, &token).await.unwrap();

        let response = fixture.service.search(SearchRequest::default(), &token).await.unwrap();
        assert_eq!(response.total_hits, 0);
    }

    #[tokio::test]
    async fn test_index_cancelled_writes_nothing() {
        let mut index = MockIndexSink::new();
        index.expect_upsert().never();
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );
        let token = CancellationToken::new();
        token.cancel();

        let result = service.index(&package("Foo", "1.0.0"), &token).await;
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_index_cancelled_not_visible_to_search() {
        let fixture = Fixture::new();
        let token = CancellationToken::new();
        token.cancel();

        let result = fixture.service.index(&package("Foo", "1.0.0"), &token).await;
        assert!(matches!(result, Err(SearchError::Cancelled)));

        let response = fixture
            .service
            .search(SearchRequest::default(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(response.total_hits, 0);
        assert!(fixture.index.is_empty());
    }

    #[tokio::test]
    async fn test_index_sink_failure_is_indexing_failure() {
        let mut index = MockIndexSink::new();
        index
            .expect_upsert()
            .times(1)
            .returning(|_| Err(anyhow!("disk full")));
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );

        let result = service
            .index(&package("Foo", "1.0.0"), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::IndexingFailure(_))));
    }

    #[tokio::test]
    async fn test_index_rejects_blank_id() {
        let fixture = Fixture::new();
        let result = fixture
            .service
            .index(&package("  ", "1.0.0"), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::Validation(_))));
    }

    #[test_log::test(tokio::test)]
    async fn test_dependents_dedup_prefers_listed() {
        let fixture = Fixture::new();
        let mut old = with_dependency(package("App", "1.0.0"), "X");
        old.listed = false;
        let new = with_dependency(package("App", "1.1.0"), "X");
        fixture.publish(vec![old, new, package("X", "1.0.0")]).await;

        let response = fixture
            .service
            .find_dependents(DependentsRequest::new("x"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.total_hits, 1);
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].id.as_str(), "App");
        assert_eq!(response.data[0].version.normalized(), "1.1.0");
        assert!(response.data[0].listed);
    }

    #[tokio::test]
    async fn test_dependents_representative_references_target() {
        let fixture = Fixture::new();
        fixture
            .publish(vec![
                with_dependency(package("App", "1.0.0"), "X"),
                with_dependency(package("App", "2.0.0"), "Y"),
            ])
            .await;

        let response = fixture
            .service
            .find_dependents(DependentsRequest::new("X"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.data[0].version.normalized(), "1.0.0");
    }

    #[tokio::test]
    async fn test_dependents_unknown_id_is_empty() {
        let fixture = Fixture::new();
        fixture.publish(vec![package("Foo", "1.0.0")]).await;

        let response = fixture
            .service
            .find_dependents(DependentsRequest::new("nonexistent-id"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response, DependentsResponse::default());
    }

    #[tokio::test]
    async fn test_dependents_paging_counts_ids() {
        let fixture = Fixture::new();
        let mut packages = Vec::new();
        for i in 0..5 {
            for v in ["1.0.0", "2.0.0"] {
                packages.push(with_dependency(package(&format!("dep{}", i), v), "Core"));
            }
        }
        fixture.publish(packages).await;

        let response = fixture
            .service
            .find_dependents(
                DependentsRequest::new("core").with_paging(3, 10),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(response.total_hits, 5);
        let ids: Vec<String> = response.data.iter().map(|d| d.id.to_string()).collect();
        assert_eq!(ids, vec!["dep3", "dep4"]);
        assert!(response.data.iter().all(|d| d.version.normalized() == "2.0.0"));
    }

    #[tokio::test]
    async fn test_dependents_listed_state_from_metadata_store() {
        let mut index = MockIndexSink::new();
        index.expect_reverse_dependencies().returning(|_| {
            Ok(vec![
                ReverseDependency {
                    dependent_id: PackageId::new("App"),
                    dependent_version: PackageVersion::parse("1.0.0").unwrap(),
                    range: "1.0.0".into(),
                    listed: true,
                    description: None,
                },
                ReverseDependency {
                    dependent_id: PackageId::new("App"),
                    dependent_version: PackageVersion::parse("2.0.0").unwrap(),
                    range: "2.0.0".into(),
                    listed: true,
                    description: None,
                },
            ])
        });
        let mut metadata = MockMetadataStore::new();
        metadata
            .expect_get_versions()
            .withf(|id| id.key() == "app")
            .times(1)
            .returning(|_| {
                Ok(vec![VersionRecord {
                    version: PackageVersion::parse("2.0.0").unwrap(),
                    listed: false,
                    dependency_groups: vec![],
                }])
            });
        let service = SearchService::new(Arc::new(index), Arc::new(metadata), SearchConfig::default());

        let response = service
            .find_dependents(DependentsRequest::new("Lib"), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(response.data[0].version.normalized(), "1.0.0");
        assert_eq!(response.data[0].range, "1.0.0");
    }

    #[tokio::test]
    async fn test_dependents_metadata_failure_propagates() {
        let mut index = MockIndexSink::new();
        index.expect_reverse_dependencies().returning(|_| {
            Ok(vec![ReverseDependency {
                dependent_id: PackageId::new("App"),
                dependent_version: PackageVersion::parse("1.0.0").unwrap(),
                range: String::new(),
                listed: true,
                description: None,
            }])
        });
        let mut metadata = MockMetadataStore::new();
        metadata
            .expect_get_versions()
            .returning(|_| Err(anyhow!("timeout")));
        let service = SearchService::new(Arc::new(index), Arc::new(metadata), SearchConfig::default());

        let result = service
            .find_dependents(DependentsRequest::new("Lib"), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::MetadataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_dependents_sink_failure_is_unavailable() {
        let mut index = MockIndexSink::new();
        index
            .expect_reverse_dependencies()
            .returning(|_| Err(anyhow!("offline")));
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );

        let result = service
            .find_dependents(DependentsRequest::new("Lib"), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::SearchUnavailable(_))));
    }

    #[tokio::test]
    async fn test_dependents_rejects_blank_id() {
        let fixture = Fixture::new();
        let result = fixture
            .service
            .find_dependents(DependentsRequest::new(" "), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_search_rejects_inconsistent_sink_total() {
        let mut index = MockIndexSink::new();
        index.expect_query().returning(|_| {
            let hit = |id: &str| {
                let document = IndexDocument::from_package(&package(id, "1.0.0"));
                QueryHit {
                    versions: vec![document.version.clone()],
                    document,
                    score: 1.0,
                }
            };
            Ok(QueryResult {
                hits: vec![hit("a"), hit("b")],
                total_hits: 1,
            })
        });
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );

        let result = service
            .search(SearchRequest::default(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SearchError::SearchUnavailable(_))));
    }

    /// Index sink whose reads never complete. `entered` fires once a read
    /// has started.
    struct StalledIndex {
        entered: Arc<Notify>,
    }

    #[async_trait]
    impl IndexSink for StalledIndex {
        async fn upsert(&self, _document: IndexDocument) -> anyhow::Result<()> {
            Ok(())
        }

        async fn query(&self, _query: &IndexQuery) -> anyhow::Result<QueryResult> {
            self.entered.notify_one();
            std::future::pending().await
        }

        async fn reverse_dependencies(
            &self,
            _target: &PackageId,
        ) -> anyhow::Result<Vec<ReverseDependency>> {
            self.entered.notify_one();
            std::future::pending().await
        }
    }

    /// Metadata store whose lookups never complete.
    struct StalledMetadata {
        entered: Arc<Notify>,
    }

    #[async_trait]
    impl MetadataStore for StalledMetadata {
        async fn get_versions(&self, _id: &PackageId) -> anyhow::Result<Vec<VersionRecord>> {
            self.entered.notify_one();
            std::future::pending().await
        }

        async fn put(&self, _package: Package) -> anyhow::Result<()> {
            Ok(())
        }
    }

    fn cancel_once_entered(entered: Arc<Notify>, token: &CancellationToken) {
        let token = token.clone();
        tokio::spawn(async move {
            entered.notified().await;
            token.cancel();
        });
    }

    fn app_depends_on_lib() -> Vec<ReverseDependency> {
        vec![ReverseDependency {
            dependent_id: PackageId::new("App"),
            dependent_version: PackageVersion::parse("1.0.0").unwrap(),
            range: "[1.0.0, )".into(),
            listed: true,
            description: None,
        }]
    }

    #[tokio::test]
    async fn test_search_cancelled_while_query_pending() {
        let entered = Arc::new(Notify::new());
        let service = SearchService::new(
            Arc::new(StalledIndex {
                entered: entered.clone(),
            }),
            Arc::new(MockMetadataStore::new()),
            SearchConfig::default(),
        );
        let token = CancellationToken::new();
        cancel_once_entered(entered, &token);

        let result = timeout(
            Duration::from_secs(5),
            service.search(SearchRequest::default(), &token),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dependents_cancelled_while_reverse_lookup_pending() {
        let entered = Arc::new(Notify::new());
        let mut metadata = MockMetadataStore::new();
        metadata.expect_get_versions().never();
        let service = SearchService::new(
            Arc::new(StalledIndex {
                entered: entered.clone(),
            }),
            Arc::new(metadata),
            SearchConfig::default(),
        );
        let token = CancellationToken::new();
        cancel_once_entered(entered, &token);

        let result = timeout(
            Duration::from_secs(5),
            service.find_dependents(DependentsRequest::new("Lib"), &token),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dependents_cancelled_after_reverse_lookup_skips_metadata() {
        let token = CancellationToken::new();
        let cancel = token.clone();
        let mut index = MockIndexSink::new();
        index.expect_reverse_dependencies().returning(move |_| {
            cancel.cancel();
            Ok(app_depends_on_lib())
        });
        let mut metadata = MockMetadataStore::new();
        metadata.expect_get_versions().never();
        let service = SearchService::new(Arc::new(index), Arc::new(metadata), SearchConfig::default());

        let result = service
            .find_dependents(DependentsRequest::new("Lib"), &token)
            .await;
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }

    #[tokio::test]
    async fn test_dependents_cancelled_while_metadata_pending() {
        let entered = Arc::new(Notify::new());
        let mut index = MockIndexSink::new();
        index
            .expect_reverse_dependencies()
            .returning(|_| Ok(app_depends_on_lib()));
        let service = SearchService::new(
            Arc::new(index),
            Arc::new(StalledMetadata {
                entered: entered.clone(),
            }),
            SearchConfig::default(),
        );
        let token = CancellationToken::new();
        cancel_once_entered(entered, &token);

        let result = timeout(
            Duration::from_secs(5),
            service.find_dependents(DependentsRequest::new("Lib"), &token),
        )
        .await
        .unwrap();
        assert!(matches!(result, Err(SearchError::Cancelled)));
    }
}
