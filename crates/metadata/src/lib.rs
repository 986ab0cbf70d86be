// Copyright (c) 2025 woxQAQ
//
// Licensed under the MIT License or Apache License 2.0
// See LICENSE files for details

//! # XMLA OLAP - Metadata Layer
//!
//! The lazily discovered object graph of an OLAP server:
//!
//! - **Session**: request properties, the [`Transport`] and the [`WorkerPool`]
//!   shared by every object of a connection
//! - **Deferred lists**: named collections fetched on first access
//! - **Model**: catalogs, schemas, cubes, dimensions, hierarchies, levels,
//!   members, measures, named sets and properties
//! - **Handlers**: turn Discover rows into model objects
//! - **Readers**: member lookup by unique name, tree navigation and level,
//!   with an identity cache in front of the network
//!
//! ## Usage
//!
//! ```rust,ignore
//! use xmla_olap_metadata::{catalog_list, SessionSettings, WorkerPool, XmlaSession};
//!
//! let session = XmlaSession::open(SessionSettings::default(), transport, WorkerPool::new()?)?;
//! let catalogs = catalog_list(&session);
//! for catalog in catalogs.to_vec()? {
//!     for schema in catalog.schemas().to_vec()? {
//!         println!("{}.{}: {} cubes", catalog.name(), schema.name(), schema.cubes().len()?);
//!     }
//! }
//! ```

pub mod cache;
pub mod context;
pub mod deferred;
pub mod element;
pub mod handler;
pub mod model;
pub mod pool;
pub mod provider;
pub mod reader;
pub mod session;
pub mod transport;

// Re-exports
pub use cache::{CacheStats, CachingMetadataReader};
pub use context::Context;
pub use deferred::{DeferredNamedList, ListPhase, NamedList};
pub use element::MetadataElement;
pub use handler::RowHandler;
pub use model::{
    catalog_list, Aggregator, Catalog, Cube, Datatype, Dimension, DimensionType, Hierarchy,
    Level, LevelType, MeasureInfo, Member, MemberType, NamedSet, Property, Schema,
    StandardMemberProperty,
};
pub use pool::{PendingRequest, WorkerPool};
pub use provider::{detect_batch_strategy, BatchLookupMode, BatchLookupStrategy};
pub use reader::{MetadataReader, RawMetadataReader};
pub use session::{SessionSettings, XmlaSession};
pub use transport::{SoapAction, Transport};

#[cfg(test)]
pub(crate) mod testing {
    //! An offline entity graph for unit tests:
    //! `FoodMart` / `FoodMart` / `[Sales]` / `[Gender]` / `[Gender]` /
    //! `[Gender].[Gender]`, with one measure.

    use std::sync::Arc;

    use async_trait::async_trait;
    use xmla_olap_protocol::{XmlaError, XmlaResult};

    use crate::model::{
        Catalog, Cube, Dimension, DimensionInfo, Hierarchy, HierarchyInfo, Level, LevelInfo,
        MeasureInfo, Member, Schema, MEASURES_LEVEL_UNIQUE_NAME, MEASURES_UNIQUE_NAME,
    };
    use crate::pool::WorkerPool;
    use crate::session::{SessionSettings, XmlaSession};
    use crate::transport::{SoapAction, Transport};

    struct OfflineTransport;

    #[async_trait]
    impl Transport for OfflineTransport {
        async fn send(&self, _request: String, _action: SoapAction) -> XmlaResult<Vec<u8>> {
            Err(XmlaError::Transport {
                message: "offline".to_string(),
                source: None,
            })
        }
    }

    pub fn offline_session() -> Arc<XmlaSession> {
        let pool = WorkerPool::new().expect("worker runtime");
        XmlaSession::new(
            SessionSettings::default()
                .with_data_source_info("Provider=Mondrian;DataSource=FoodMart")
                .with_catalog("FoodMart"),
            Arc::new(OfflineTransport),
            pool,
        )
    }

    pub struct SampleGraph {
        pub session: Arc<XmlaSession>,
        pub catalog: Arc<Catalog>,
        pub schema: Arc<Schema>,
        pub cube: Arc<Cube>,
        pub dimension: Arc<Dimension>,
        pub hierarchy: Arc<Hierarchy>,
        pub level: Arc<Level>,
    }

    pub fn sample_graph() -> SampleGraph {
        let session = offline_session();
        let catalog = Catalog::new(Arc::clone(&session), "FoodMart".into(), None);
        let schema = Schema::new(&catalog, "FoodMart".into());
        let cube = Cube::new(&schema, "Sales".into(), None, Some("Sales cube".into()));
        let dimension = Dimension::new(
            &cube,
            DimensionInfo {
                unique_name: "[Gender]".into(),
                name: "Gender".into(),
                ordinal: 1,
                ..Default::default()
            },
        );
        let hierarchy = Hierarchy::new(
            &dimension,
            HierarchyInfo {
                unique_name: "[Gender]".into(),
                name: "Gender".into(),
                all_member: Some("[Gender].[All Gender]".into()),
                default_member: Some("[Gender].[All Gender]".into()),
                ..Default::default()
            },
        );
        let level = Level::new(
            &hierarchy,
            LevelInfo {
                unique_name: "[Gender].[Gender]".into(),
                name: "Gender".into(),
                depth: 1,
                ..Default::default()
            },
        );
        let measure = Arc::new(
            Member::new("[Measures].[Unit Sales]", "Unit Sales")
                .in_cube(Arc::downgrade(&cube))
                .with_level(MEASURES_LEVEL_UNIQUE_NAME, MEASURES_UNIQUE_NAME, MEASURES_UNIQUE_NAME)
                .with_ordinal(0)
                .with_measure(MeasureInfo::default()),
        );

        hierarchy.preload(vec![Arc::clone(&level)]);
        dimension.preload(vec![Arc::clone(&hierarchy)]);
        cube.preload(vec![Arc::clone(&dimension)], vec![measure]);
        schema.preload(vec![Arc::clone(&cube)]);
        catalog.preload(vec![Arc::clone(&schema)]);

        SampleGraph {
            session,
            catalog,
            schema,
            cube,
            dimension,
            hierarchy,
            level,
        }
    }
}
