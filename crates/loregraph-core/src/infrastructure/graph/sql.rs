//! Persistent graph engine over SQL
//!
//! Uses sqlx with the SQLite driver. Variable-length traversals are
//! recursive CTEs; whole-graph analytics pull a [`GraphSnapshot`] and run the
//! shared algorithms. The connection is opened lazily on first use and the
//! schema is migrated at that point.
//!
//! Identity is enforced with check-then-insert, which is not atomic under
//! concurrent writers; every read collapses duplicate rows by keeping the
//! oldest row per identity key.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::Path as FsPath;

use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::domain::graph::algorithms::{self, neighbor_order, strongest};
use crate::domain::graph::export::export_snapshot;
use crate::domain::graph::{
    CentralityResult, CliqueResult, DEFAULT_MAX_HOPS, Entity, EntityType, ExportFormat,
    ExportResult, GraphPort, GraphSnapshot, GraphStats, Metadata, Neighbor, Path, Relationship,
    RelationshipType, canonicalize,
};
use crate::error::{ErrorCode, GraphError, Result, ResultExt};
use crate::storage::{Database, DatabaseConfig, IN_MEMORY_URI, MigrationStatus};

/// Oldest row id per entity identity
const ENTITY_IDS: &str =
    "SELECT MIN(id) FROM graph_entities WHERE namespace = ? GROUP BY canonical_name";

/// Oldest row id per relationship identity
const EDGE_IDS: &str = "SELECT MIN(id) FROM graph_relationships WHERE namespace = ? \
                        GROUP BY source, target, relationship_type";

/// Connection settings for the persistent engine
#[derive(Clone)]
pub struct SqlGraphSettings {
    /// Connection URI; only `sqlite:` URIs have a driver compiled in
    pub uri: String,
    /// Principal for drivers that authenticate
    pub user: Option<String>,
    /// Credential for drivers that authenticate
    pub password: Option<String>,
    /// Logical database name; stored as the namespace of every row
    pub database: String,
    /// Maximum pooled connections
    pub max_connections: u32,
}

impl SqlGraphSettings {
    /// Settings for a URI with the default namespace
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            user: None,
            password: None,
            database: crate::config::DEFAULT_DATABASE.to_string(),
            max_connections: crate::storage::DEFAULT_MAX_CONNECTIONS,
        }
    }

    /// Settings for a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(IN_MEMORY_URI)
    }

    /// Set the logical database name
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }
}

impl fmt::Debug for SqlGraphSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlGraphSettings")
            .field("uri", &self.uri)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Persistent graph engine
#[derive(Debug)]
pub struct SqlGraph {
    settings: SqlGraphSettings,
    db: OnceCell<Database>,
}

impl SqlGraph {
    /// Create an engine; no connection is made until the first operation
    pub fn new(settings: SqlGraphSettings) -> Self {
        Self {
            settings,
            db: OnceCell::new(),
        }
    }

    /// Engine over a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(SqlGraphSettings::in_memory())
    }

    /// Connection settings
    pub fn settings(&self) -> &SqlGraphSettings {
        &self.settings
    }

    fn namespace(&self) -> &str {
        &self.settings.database
    }

    /// Get the database, connecting and migrating on first use
    async fn database(&self) -> Result<&Database> {
        self.db
            .get_or_try_init(|| async {
                let uri = &self.settings.uri;
                if !uri.starts_with("sqlite:") {
                    let scheme = uri.split(':').next().unwrap_or_default();
                    return Err(GraphError::new(
                        ErrorCode::DriverNotAvailable,
                        format!("No graph driver available for scheme '{}'", scheme),
                    )
                    .with_detail("uri", uri));
                }

                let config = DatabaseConfig::with_uri(uri.clone())
                    .max_connections(self.settings.max_connections);
                let db = Database::new(config).await.map_err(|e| {
                    GraphError::new(ErrorCode::ConnectionFailed, "Failed to connect to graph store")
                        .with_detail("uri", uri)
                        .with_cause(format!("{:#}", e))
                })?;
                info!(uri = %uri, database = %self.settings.database, "Connected to graph store");
                Ok(db)
            })
            .await
    }

    async fn pool(&self) -> Result<&SqlitePool> {
        Ok(self.database().await?.pool())
    }

    /// Schema version of the connected store
    pub async fn schema_status(&self) -> Result<MigrationStatus> {
        self.database()
            .await?
            .migration_status()
            .await
            .map_err(|e| {
                GraphError::new(ErrorCode::ConnectionFailed, "Failed to read schema version")
                    .with_cause(format!("{:#}", e))
            })
    }

    async fn find_entity(&self, pool: &SqlitePool, name: &str) -> Result<Option<Entity>> {
        let row: Option<EntityRow> = sqlx::query_as(
            r#"
            SELECT * FROM graph_entities
            WHERE namespace = ? AND canonical_name = ?
            ORDER BY id
            LIMIT 1
            "#,
        )
        .bind(self.namespace())
        .bind(canonicalize(name))
        .fetch_optional(pool)
        .await
        .or_code(ErrorCode::GetEntityFailed, "Failed to query entity")?;

        row.map(EntityRow::into_entity).transpose()
    }

    async fn require_entity(&self, pool: &SqlitePool, name: &str) -> Result<Entity> {
        self.find_entity(pool, name)
            .await?
            .ok_or_else(|| GraphError::entity_not_found(name))
    }

    /// Resolve an endpoint's display name, inserting a placeholder if missing
    async fn ensure_endpoint(&self, pool: &SqlitePool, name: &str) -> Result<String> {
        if let Some(entity) = self.find_entity(pool, name).await? {
            return Ok(entity.name);
        }
        debug!(entity = %name, "Creating placeholder entity");
        let placeholder = Entity::placeholder(name.trim());
        self.insert_entity(pool, &placeholder).await?;
        Ok(placeholder.name)
    }

    async fn insert_entity(&self, pool: &SqlitePool, entity: &Entity) -> Result<()> {
        let aliases_json = serde_json::to_string(&entity.aliases)
            .or_code(ErrorCode::AddEntityFailed, "Failed to serialize aliases")?;
        let metadata_json = serde_json::to_string(&entity.metadata)
            .or_code(ErrorCode::AddEntityFailed, "Failed to serialize metadata")?;

        sqlx::query(
            r#"
            INSERT INTO graph_entities (
                namespace, canonical_name, name, entity_type, aliases, description, metadata
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(self.namespace())
        .bind(entity.canonical_name())
        .bind(&entity.name)
        .bind(entity.entity_type.as_str())
        .bind(&aliases_json)
        .bind(&entity.description)
        .bind(&metadata_json)
        .execute(pool)
        .await
        .map_err(|e| {
            GraphError::new(ErrorCode::AddEntityFailed, "Failed to insert entity")
                .with_detail("entity", &entity.name)
                .with_cause(e)
        })?;
        Ok(())
    }

    async fn relationships_between(
        &self,
        pool: &SqlitePool,
        source: &str,
        target: &str,
    ) -> Result<Vec<Relationship>> {
        let query = format!(
            r#"
            SELECT * FROM graph_relationships
            WHERE namespace = ? AND source = ? AND target = ? AND id IN ({})
            ORDER BY id
            "#,
            EDGE_IDS
        );
        let rows: Vec<RelationshipRow> = sqlx::query_as(&query)
            .bind(self.namespace())
            .bind(canonicalize(source))
            .bind(canonicalize(target))
            .bind(self.namespace())
            .fetch_all(pool)
            .await
            .or_code(ErrorCode::GetRelationshipsFailed, "Failed to query relationships")?;

        rows.into_iter().map(RelationshipRow::into_relationship).collect()
    }

    /// Entities by canonical name
    async fn entities_named(
        &self,
        pool: &SqlitePool,
        canonical_names: &[String],
    ) -> Result<HashMap<String, Entity>> {
        if canonical_names.is_empty() {
            return Ok(HashMap::new());
        }
        let query = format!(
            "SELECT * FROM graph_entities WHERE namespace = ? AND canonical_name IN ({}) AND id IN ({})",
            placeholders(canonical_names.len()),
            ENTITY_IDS
        );
        let mut query_builder = sqlx::query_as::<_, EntityRow>(&query).bind(self.namespace());
        for name in canonical_names {
            query_builder = query_builder.bind(name);
        }
        let rows = query_builder
            .bind(self.namespace())
            .fetch_all(pool)
            .await
            .or_code(ErrorCode::GetEntityFailed, "Failed to query entities")?;

        rows.into_iter()
            .map(|r| {
                let canonical = r.canonical_name.clone();
                Ok((canonical, r.into_entity()?))
            })
            .collect()
    }

    /// Hop limit for a path search: the caller's bound or the default,
    /// never more than the number of entities
    async fn hop_bound(&self, pool: &SqlitePool, requested: Option<usize>) -> Result<usize> {
        let entities = self.entity_count(pool).await?;
        Ok(requested.unwrap_or(DEFAULT_MAX_HOPS).min(entities))
    }

    async fn entity_count(&self, pool: &SqlitePool) -> Result<usize> {
        let (count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT canonical_name) FROM graph_entities WHERE namespace = ?",
        )
        .bind(self.namespace())
        .fetch_one(pool)
        .await
        .or_code(ErrorCode::GetStatsFailed, "Failed to count entities")?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    /// Relationships leaving every node fewer than `bound` hops from `start`
    ///
    /// The recursive part keeps one row per (node, depth) pair, so the work
    /// grows with nodes times hops and not with the number of paths.
    async fn hop_region(
        &self,
        pool: &SqlitePool,
        start: &str,
        bound: usize,
        walk: Walk,
    ) -> Result<Vec<RelationshipRow>> {
        let (near, far) = walk.columns();
        let query = format!(
            r#"
            WITH RECURSIVE reach(node, depth) AS (
                SELECT ?, 0
                UNION
                SELECT r.{far}, reach.depth + 1
                FROM reach
                JOIN graph_relationships r ON r.namespace = ? AND r.{near} = reach.node
                WHERE reach.depth + 1 < ?
            )
            SELECT r.* FROM graph_relationships r
            WHERE r.namespace = ?
                AND r.{near} IN (SELECT node FROM reach)
                AND r.id IN ({edge_ids})
            ORDER BY r.id
            "#,
            edge_ids = EDGE_IDS,
        );

        sqlx::query_as(&query)
            .bind(start)
            .bind(self.namespace())
            .bind(i64::try_from(bound).unwrap_or(i64::MAX))
            .bind(self.namespace())
            .bind(self.namespace())
            .fetch_all(pool)
            .await
            .or_code(ErrorCode::FindPathFailed, "Failed to walk graph region")
    }

    /// Copy the whole namespace into a snapshot, oldest rows first
    pub async fn snapshot(&self) -> Result<GraphSnapshot> {
        let pool = self.pool().await?;

        let entity_rows: Vec<EntityRow> =
            sqlx::query_as("SELECT * FROM graph_entities WHERE namespace = ? ORDER BY id")
                .bind(self.namespace())
                .fetch_all(pool)
                .await
                .or_code(ErrorCode::GetEntitiesFailed, "Failed to load entities")?;
        let relationship_rows: Vec<RelationshipRow> =
            sqlx::query_as("SELECT * FROM graph_relationships WHERE namespace = ? ORDER BY id")
                .bind(self.namespace())
                .fetch_all(pool)
                .await
                .or_code(ErrorCode::GetRelationshipsFailed, "Failed to load relationships")?;

        let entities = entity_rows
            .into_iter()
            .map(EntityRow::into_entity)
            .collect::<Result<Vec<_>>>()?;
        let relationships = relationship_rows
            .into_iter()
            .map(RelationshipRow::into_relationship)
            .collect::<Result<Vec<_>>>()?;

        Ok(GraphSnapshot::new(entities, relationships))
    }

    async fn count_types<T: Ord>(
        &self,
        pool: &SqlitePool,
        query: &str,
        parse: impl Fn(&str) -> Option<T>,
    ) -> Result<BTreeMap<T, usize>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(query)
            .bind(self.namespace())
            .bind(self.namespace())
            .fetch_all(pool)
            .await
            .or_code(ErrorCode::GetStatsFailed, "Failed to count types")?;

        let mut counts = BTreeMap::new();
        for (name, count) in rows {
            match parse(&name) {
                Some(t) => *counts.entry(t).or_insert(0) += count as usize,
                None => warn!(type_name = %name, "Skipping unknown type in stats"),
            }
        }
        Ok(counts)
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Direction of a region walk
#[derive(Debug, Clone, Copy)]
enum Walk {
    Forward,
    Backward,
}

impl Walk {
    /// (column matched against the reached node, column reached next)
    fn columns(self) -> (&'static str, &'static str) {
        match self {
            Self::Forward => ("source", "target"),
            Self::Backward => ("target", "source"),
        }
    }
}

/// Adjacency over canonical names, built from region rows
#[derive(Debug, Default)]
struct HopGraph {
    names: Vec<String>,
    index: HashMap<String, usize>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
    edges: HashMap<(usize, usize), Vec<Relationship>>,
}

impl HopGraph {
    fn node(&mut self, name: &str) -> usize {
        if let Some(&index) = self.index.get(name) {
            return index;
        }
        let index = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), index);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        index
    }

    /// Add rows, skipping edges already present
    fn extend(&mut self, rows: Vec<RelationshipRow>) -> Result<()> {
        for row in rows {
            let source = self.node(&row.source);
            let target = self.node(&row.target);
            let relationship = row.into_relationship()?;

            let parallel = self.edges.entry((source, target)).or_default();
            if parallel
                .iter()
                .any(|r| r.relationship_type == relationship.relationship_type)
            {
                continue;
            }
            parallel.push(relationship);
            self.successors[source].push(target);
            self.predecessors[target].push(source);
        }
        Ok(())
    }

    /// Order every adjacency list by canonical name, one entry per node
    fn sorted(mut self) -> Self {
        for list in self.successors.iter_mut().chain(self.predecessors.iter_mut()) {
            list.sort_by(|a, b| self.names[*a].cmp(&self.names[*b]));
            list.dedup();
        }
        self
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn name(&self, node: usize) -> &str {
        &self.names[node]
    }

    fn names(&self) -> &[String] {
        &self.names
    }

    fn successors(&self, node: usize) -> Vec<usize> {
        self.successors[node].clone()
    }

    fn predecessors(&self, node: usize) -> Vec<usize> {
        self.predecessors[node].clone()
    }

    /// Resolve a node sequence, choosing the strongest relationship per hop
    fn path(&self, nodes: &[usize], entities: &HashMap<String, Entity>) -> Option<Path> {
        let names = nodes
            .iter()
            .map(|n| entities.get(self.name(*n)).map(|e| e.name.clone()))
            .collect::<Option<Vec<_>>>()?;
        let relationships = nodes
            .windows(2)
            .map(|hop| {
                self.edges
                    .get(&(hop[0], hop[1]))
                    .and_then(strongest)
                    .cloned()
            })
            .collect::<Option<Vec<_>>>()?;
        Some(Path::new(names, relationships))
    }
}

fn type_filter(column: &str, types: Option<&[RelationshipType]>) -> String {
    match types {
        Some(types) => format!(" AND {} IN ({})", column, placeholders(types.len())),
        None => String::new(),
    }
}

#[async_trait]
impl GraphPort for SqlGraph {
    // ========== Entity Operations ==========

    async fn add_entity(&mut self, entity: &Entity) -> Result<bool> {
        if !entity.is_valid() {
            return Err(GraphError::new(ErrorCode::AddEntityFailed, "Entity name must not be empty")
                .with_detail("entity", &entity.name));
        }
        let pool = self.pool().await?;

        let existing = self
            .find_entity(pool, &entity.name)
            .await
            .map_err(|e| e.within(ErrorCode::AddEntityFailed))?;
        if existing.is_some() {
            debug!(entity = %entity.name, "Entity already exists");
            return Ok(false);
        }

        self.insert_entity(pool, entity).await?;
        debug!(entity = %entity.name, entity_type = %entity.entity_type, "Entity added");
        Ok(true)
    }

    async fn get_entity(&self, name: &str) -> Result<Option<Entity>> {
        let pool = self.pool().await?;
        self.find_entity(pool, name).await
    }

    async fn get_all_entities(
        &self,
        entity_type: Option<EntityType>,
        limit: Option<usize>,
    ) -> Result<Vec<Entity>> {
        let pool = self.pool().await?;

        let mut query = format!(
            "SELECT * FROM graph_entities WHERE namespace = ? AND id IN ({})",
            ENTITY_IDS
        );
        if entity_type.is_some() {
            query.push_str(" AND entity_type = ?");
        }
        query.push_str(" ORDER BY id");
        if limit.is_some() {
            query.push_str(" LIMIT ?");
        }

        let mut query_builder = sqlx::query_as::<_, EntityRow>(&query)
            .bind(self.namespace())
            .bind(self.namespace());
        if let Some(t) = entity_type {
            query_builder = query_builder.bind(t.as_str());
        }
        if let Some(n) = limit {
            query_builder = query_builder.bind(i64::try_from(n).unwrap_or(i64::MAX));
        }

        let rows = query_builder
            .fetch_all(pool)
            .await
            .or_code(ErrorCode::GetEntitiesFailed, "Failed to list entities")?;
        rows.into_iter()
            .map(EntityRow::into_entity)
            .collect::<Result<Vec<_>>>()
            .map_err(|e| e.within(ErrorCode::GetEntitiesFailed))
    }

    async fn remove_entity(&mut self, name: &str) -> Result<bool> {
        let pool = self.pool().await?;
        let canonical = canonicalize(name);

        let mut tx = pool
            .begin()
            .await
            .or_code(ErrorCode::RemoveEntityFailed, "Failed to begin transaction")?;

        let relationships = sqlx::query(
            "DELETE FROM graph_relationships WHERE namespace = ? AND (source = ? OR target = ?)",
        )
        .bind(self.namespace())
        .bind(&canonical)
        .bind(&canonical)
        .execute(&mut *tx)
        .await
        .or_code(ErrorCode::RemoveEntityFailed, "Failed to remove relationships")?;

        let entities =
            sqlx::query("DELETE FROM graph_entities WHERE namespace = ? AND canonical_name = ?")
                .bind(self.namespace())
                .bind(&canonical)
                .execute(&mut *tx)
                .await
                .or_code(ErrorCode::RemoveEntityFailed, "Failed to remove entity")?;

        tx.commit()
            .await
            .or_code(ErrorCode::RemoveEntityFailed, "Failed to commit removal")?;

        let removed = entities.rows_affected() > 0;
        if removed {
            info!(
                entity = %name,
                relationships_removed = relationships.rows_affected(),
                "Entity removed"
            );
        }
        Ok(removed)
    }

    // ========== Relationship Operations ==========

    async fn add_relationship(&mut self, relationship: &Relationship) -> Result<bool> {
        if let Some(reason) = relationship.validation_error() {
            return Err(GraphError::new(ErrorCode::AddRelationshipFailed, "Invalid relationship")
                .with_detail("source", &relationship.source)
                .with_detail("target", &relationship.target)
                .with_detail("reason", reason));
        }
        let pool = self.pool().await?;
        let key = relationship.key();

        let existing: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT id FROM graph_relationships
            WHERE namespace = ? AND source = ? AND target = ? AND relationship_type = ?
            LIMIT 1
            "#,
        )
        .bind(self.namespace())
        .bind(&key.source)
        .bind(&key.target)
        .bind(key.relationship_type.as_str())
        .fetch_optional(pool)
        .await
        .or_code(ErrorCode::AddRelationshipFailed, "Failed to check relationship")?;
        if existing.is_some() {
            debug!(
                source = %relationship.source,
                target = %relationship.target,
                relationship_type = %relationship.relationship_type,
                "Relationship already exists"
            );
            return Ok(false);
        }

        let source_name = self
            .ensure_endpoint(pool, &relationship.source)
            .await
            .map_err(|e| e.within(ErrorCode::AddRelationshipFailed))?;
        let target_name = self
            .ensure_endpoint(pool, &relationship.target)
            .await
            .map_err(|e| e.within(ErrorCode::AddRelationshipFailed))?;

        let metadata_json = serde_json::to_string(&relationship.metadata)
            .or_code(ErrorCode::AddRelationshipFailed, "Failed to serialize metadata")?;

        sqlx::query(
            r#"
            INSERT INTO graph_relationships (
                namespace, source, target, source_name, target_name,
                relationship_type, context, strength, metadata
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(self.namespace())
        .bind(&key.source)
        .bind(&key.target)
        .bind(&source_name)
        .bind(&target_name)
        .bind(key.relationship_type.as_str())
        .bind(&relationship.context)
        .bind(relationship.strength)
        .bind(&metadata_json)
        .execute(pool)
        .await
        .map_err(|e| {
            GraphError::new(ErrorCode::AddRelationshipFailed, "Failed to insert relationship")
                .with_detail("source", &relationship.source)
                .with_detail("target", &relationship.target)
                .with_cause(e)
        })?;

        debug!(
            source = %relationship.source,
            target = %relationship.target,
            relationship_type = %relationship.relationship_type,
            "Relationship added"
        );
        Ok(true)
    }

    async fn get_relationships(
        &self,
        name: &str,
        relationship_type: Option<RelationshipType>,
    ) -> Result<Vec<Relationship>> {
        let pool = self.pool().await?;
        let canonical = canonicalize(name);

        let mut query = format!(
            r#"
            SELECT * FROM graph_relationships
            WHERE namespace = ? AND (source = ? OR target = ?) AND id IN ({})
            "#,
            EDGE_IDS
        );
        if relationship_type.is_some() {
            query.push_str(" AND relationship_type = ?");
        }
        query.push_str(" ORDER BY id");

        let mut query_builder = sqlx::query_as::<_, RelationshipRow>(&query)
            .bind(self.namespace())
            .bind(&canonical)
            .bind(&canonical)
            .bind(self.namespace());
        if let Some(t) = relationship_type {
            query_builder = query_builder.bind(t.as_str());
        }

        let rows = query_builder
            .fetch_all(pool)
            .await
            .or_code(ErrorCode::GetRelationshipsFailed, "Failed to query relationships")?;
        rows.into_iter().map(RelationshipRow::into_relationship).collect()
    }

    async fn get_relationships_between(
        &self,
        source: &str,
        target: &str,
    ) -> Result<Vec<Relationship>> {
        let pool = self.pool().await?;
        self.relationships_between(pool, source, target).await
    }

    async fn remove_relationship(
        &mut self,
        source: &str,
        target: &str,
        relationship_type: RelationshipType,
    ) -> Result<bool> {
        let pool = self.pool().await?;
        let result = sqlx::query(
            r#"
            DELETE FROM graph_relationships
            WHERE namespace = ? AND source = ? AND target = ? AND relationship_type = ?
            "#,
        )
        .bind(self.namespace())
        .bind(canonicalize(source))
        .bind(canonicalize(target))
        .bind(relationship_type.as_str())
        .execute(pool)
        .await
        .or_code(ErrorCode::RemoveRelationshipFailed, "Failed to remove relationship")?;

        let removed = result.rows_affected() > 0;
        if removed {
            info!(
                source = %source,
                target = %target,
                relationship_type = %relationship_type,
                "Relationship removed"
            );
        }
        Ok(removed)
    }

    async fn clear(&mut self) -> Result<()> {
        let pool = self.pool().await?;
        let mut tx = pool
            .begin()
            .await
            .or_code(ErrorCode::ClearFailed, "Failed to begin transaction")?;

        let edges = sqlx::query("DELETE FROM graph_relationships WHERE namespace = ?")
            .bind(self.namespace())
            .execute(&mut *tx)
            .await
            .or_code(ErrorCode::ClearFailed, "Failed to clear relationships")?;
        let nodes = sqlx::query("DELETE FROM graph_entities WHERE namespace = ?")
            .bind(self.namespace())
            .execute(&mut *tx)
            .await
            .or_code(ErrorCode::ClearFailed, "Failed to clear entities")?;

        tx.commit()
            .await
            .or_code(ErrorCode::ClearFailed, "Failed to commit clear")?;

        info!(
            nodes = nodes.rows_affected(),
            edges = edges.rows_affected(),
            database = %self.namespace(),
            "Graph cleared"
        );
        Ok(())
    }

    // ========== Traversal Operations ==========

    async fn get_neighbors(
        &self,
        name: &str,
        max_depth: u32,
        relationship_types: Option<&[RelationshipType]>,
    ) -> Result<Vec<Neighbor>> {
        let pool = self.pool().await?;
        let root = self
            .require_entity(pool, name)
            .await
            .map_err(|e| e.within(ErrorCode::GetNeighborsFailed))?;
        if max_depth == 0 || relationship_types.is_some_and(<[_]>::is_empty) {
            return Ok(Vec::new());
        }
        let root_key = root.canonical_name();

        // (node, depth) pairs along outgoing edges; the minimum depth per node
        // is where it is first reached, and its parent edge comes from a node
        // one level closer
        let query = format!(
            r#"
            WITH RECURSIVE reach(node, depth) AS (
                SELECT ?, 0
                UNION
                SELECT r.target, reach.depth + 1
                FROM reach
                JOIN graph_relationships r ON r.namespace = ? AND r.source = reach.node
                WHERE reach.depth < ?{reach_filter}
            ),
            first_seen(node, depth) AS (
                SELECT node, MIN(depth) FROM reach GROUP BY node
            )
            SELECT r.*, f.depth AS distance
            FROM first_seen f
            JOIN first_seen p ON p.depth = f.depth - 1
            JOIN graph_relationships r
                ON r.namespace = ? AND r.source = p.node AND r.target = f.node{edge_filter}
            WHERE f.depth > 0 AND r.id IN ({edge_ids})
            ORDER BY f.depth, r.id
            "#,
            reach_filter = type_filter("r.relationship_type", relationship_types),
            edge_filter = type_filter("r.relationship_type", relationship_types),
            edge_ids = EDGE_IDS,
        );

        let mut query_builder = sqlx::query_as::<_, NeighborRow>(&query)
            .bind(&root_key)
            .bind(self.namespace())
            .bind(i64::from(max_depth));
        for t in relationship_types.unwrap_or_default() {
            query_builder = query_builder.bind(t.as_str());
        }
        query_builder = query_builder.bind(self.namespace());
        for t in relationship_types.unwrap_or_default() {
            query_builder = query_builder.bind(t.as_str());
        }
        query_builder = query_builder.bind(self.namespace());

        let rows = query_builder
            .fetch_all(pool)
            .await
            .or_code(ErrorCode::GetNeighborsFailed, "Failed to traverse neighbors")?;

        // strongest parent edge per reached node
        let mut reached: BTreeMap<String, (u32, Relationship)> = BTreeMap::new();
        for row in rows {
            let distance = u32::try_from(row.distance).unwrap_or(u32::MAX);
            let target = row.relationship.target.clone();
            let relationship = row.relationship.into_relationship()?;
            match reached.get_mut(&target) {
                Some((_, best)) => {
                    let replace = strongest([&*best, &relationship])
                        .is_some_and(|chosen| std::ptr::eq(chosen, &relationship));
                    if replace {
                        *best = relationship;
                    }
                }
                None => {
                    reached.insert(target, (distance, relationship));
                }
            }
        }

        let keys: Vec<String> = reached.keys().cloned().collect();
        let entities = self
            .entities_named(pool, &keys)
            .await
            .map_err(|e| e.within(ErrorCode::GetNeighborsFailed))?;

        let mut neighbors: Vec<Neighbor> = reached
            .into_iter()
            .filter(|(key, _)| *key != root_key)
            .map(|(key, (distance, relationship))| Neighbor {
                entity: entities
                    .get(&key)
                    .cloned()
                    .unwrap_or_else(|| Entity::placeholder(relationship.target.clone())),
                relationship,
                distance,
            })
            .collect();

        neighbors.sort_by(neighbor_order);
        debug!(entity = %name, max_depth, count = neighbors.len(), "Neighbors found");
        Ok(neighbors)
    }

    async fn find_path(
        &self,
        source: &str,
        target: &str,
        max_length: Option<usize>,
    ) -> Result<Option<Path>> {
        let pool = self.pool().await?;
        let from = self
            .require_entity(pool, source)
            .await
            .map_err(|e| e.within(ErrorCode::FindPathFailed))?;
        let to = self
            .require_entity(pool, target)
            .await
            .map_err(|e| e.within(ErrorCode::FindPathFailed))?;

        if from.canonical_name() == to.canonical_name() {
            return Ok(Some(Path::trivial(from.name)));
        }
        let bound = self
            .hop_bound(pool, max_length)
            .await
            .map_err(|e| e.within(ErrorCode::FindPathFailed))?;
        if bound == 0 {
            return Ok(None);
        }

        // complete successor lists for every node the forward search can
        // expand, and predecessor lists for the backward search
        let (from_key, to_key) = (from.canonical_name(), to.canonical_name());
        let mut hops = HopGraph::default();
        for (start, walk) in [(&from_key, Walk::Forward), (&to_key, Walk::Backward)] {
            let rows = self
                .hop_region(pool, start, bound, walk)
                .await
                .map_err(|e| e.within(ErrorCode::FindPathFailed))?;
            hops.extend(rows)?;
        }
        let hops = hops.sorted();

        let nodes = match (hops.position(&from_key), hops.position(&to_key)) {
            (Some(start), Some(goal)) => algorithms::bidirectional_shortest_path(
                start,
                goal,
                |n| hops.successors(n),
                |n| hops.predecessors(n),
            )
            .filter(|nodes| nodes.len() - 1 <= bound),
            _ => None,
        };

        let path = match nodes {
            Some(nodes) => {
                let keys: Vec<String> = nodes.iter().map(|n| hops.name(*n).to_string()).collect();
                let entities = self
                    .entities_named(pool, &keys)
                    .await
                    .map_err(|e| e.within(ErrorCode::FindPathFailed))?;
                hops.path(&nodes, &entities)
            }
            None => None,
        };

        debug!(source = %source, target = %target, found = path.is_some(), "Path lookup");
        Ok(path)
    }

    async fn find_all_shortest_paths(
        &self,
        source: &str,
        max_length: Option<usize>,
        cutoff: Option<usize>,
    ) -> Result<BTreeMap<String, Path>> {
        let pool = self.pool().await?;
        let from = self
            .require_entity(pool, source)
            .await
            .map_err(|e| e.within(ErrorCode::FindPathsFailed))?;
        let requested = [max_length, cutoff].into_iter().flatten().min();
        let bound = self
            .hop_bound(pool, requested)
            .await
            .map_err(|e| e.within(ErrorCode::FindPathsFailed))?;
        if bound == 0 {
            return Ok(BTreeMap::new());
        }

        let from_key = from.canonical_name();
        let rows = self
            .hop_region(pool, &from_key, bound, Walk::Forward)
            .await
            .map_err(|e| e.within(ErrorCode::FindPathsFailed))?;
        let mut hops = HopGraph::default();
        hops.extend(rows)?;
        let hops = hops.sorted();

        let Some(start) = hops.position(&from_key) else {
            return Ok(BTreeMap::new());
        };
        let found = algorithms::single_source_shortest_paths(start, Some(bound), |n| {
            hops.successors(n)
        });
        let entities = self
            .entities_named(pool, hops.names())
            .await
            .map_err(|e| e.within(ErrorCode::FindPathsFailed))?;

        let mut paths = BTreeMap::new();
        for (_, nodes) in found {
            if let Some(path) = hops.path(&nodes, &entities) {
                if let Some(target) = path.entities.last() {
                    paths.insert(target.clone(), path);
                }
            }
        }
        debug!(source = %source, bound, count = paths.len(), "Shortest paths found");
        Ok(paths)
    }

    // ========== Analytics ==========

    async fn find_cliques(
        &self,
        min_size: usize,
        max_size: Option<usize>,
        entity_type: Option<EntityType>,
    ) -> Result<CliqueResult> {
        let snapshot = self
            .snapshot()
            .await
            .map_err(|e| e.within(ErrorCode::FindCliquesFailed))?;
        Ok(algorithms::find_cliques(&snapshot, min_size, max_size, entity_type))
    }

    async fn get_centrality(
        &self,
        name: Option<&str>,
        top_n: Option<usize>,
    ) -> Result<Vec<CentralityResult>> {
        let snapshot = self
            .snapshot()
            .await
            .map_err(|e| e.within(ErrorCode::CentralityFailed))?;
        Ok(algorithms::centrality(&snapshot, name, top_n))
    }

    async fn get_stats(&self) -> Result<GraphStats> {
        let pool = self.pool().await?;

        let node_count = self.entity_count(pool).await?;

        let (edge_count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM (
                SELECT DISTINCT source, target, relationship_type
                FROM graph_relationships WHERE namespace = ?
            )
            "#,
        )
        .bind(self.namespace())
        .fetch_one(pool)
        .await
        .or_code(ErrorCode::GetStatsFailed, "Failed to count relationships")?;

        let entity_types = self
            .count_types(
                pool,
                &format!(
                    "SELECT entity_type, COUNT(*) FROM graph_entities \
                     WHERE namespace = ? AND id IN ({}) GROUP BY entity_type",
                    ENTITY_IDS
                ),
                EntityType::parse,
            )
            .await?;
        let relationship_types = self
            .count_types(
                pool,
                &format!(
                    "SELECT relationship_type, COUNT(*) FROM graph_relationships \
                     WHERE namespace = ? AND id IN ({}) GROUP BY relationship_type",
                    EDGE_IDS
                ),
                RelationshipType::parse,
            )
            .await?;

        Ok(GraphStats {
            node_count,
            edge_count: edge_count as usize,
            entity_types,
            relationship_types,
        })
    }

    async fn health_check(&self) -> bool {
        let db = match self.database().await {
            Ok(db) => db,
            Err(e) => {
                warn!(error = %e, "Graph store unavailable");
                return false;
            }
        };
        match db.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "Graph store health check failed");
                false
            }
        }
    }

    // ========== Export ==========

    async fn export_json(&self, path: Option<&FsPath>, pretty: bool) -> Result<ExportResult> {
        let snapshot = self
            .snapshot()
            .await
            .map_err(|e| e.within(ErrorCode::ExportFailed))?;
        export_snapshot(&snapshot, ExportFormat::Json, path, pretty, true)
    }

    async fn export_graphml(
        &self,
        path: Option<&FsPath>,
        include_metadata: bool,
    ) -> Result<ExportResult> {
        let snapshot = self
            .snapshot()
            .await
            .map_err(|e| e.within(ErrorCode::ExportFailed))?;
        export_snapshot(&snapshot, ExportFormat::Graphml, path, false, include_metadata)
    }
}

// ========== Row Types ==========

#[derive(Debug, FromRow)]
struct EntityRow {
    canonical_name: String,
    name: String,
    entity_type: String,
    aliases: String,
    description: String,
    metadata: String,
}

impl EntityRow {
    fn into_entity(self) -> Result<Entity> {
        let entity_type = EntityType::parse(&self.entity_type).ok_or_else(|| {
            GraphError::new(ErrorCode::GetEntityFailed, "Invalid entity type in store")
                .with_detail("entity", &self.name)
                .with_detail("entity_type", &self.entity_type)
        })?;

        let aliases: Vec<String> = serde_json::from_str(&self.aliases).map_err(|e| {
            GraphError::new(ErrorCode::GetEntityFailed, "Invalid aliases in store")
                .with_detail("entity", &self.name)
                .with_cause(e)
        })?;
        let metadata: Metadata = serde_json::from_str(&self.metadata).map_err(|e| {
            GraphError::new(ErrorCode::GetEntityFailed, "Invalid metadata in store")
                .with_detail("entity", &self.name)
                .with_cause(e)
        })?;

        Ok(Entity {
            name: self.name,
            entity_type,
            aliases,
            description: self.description,
            metadata,
        })
    }
}

#[derive(Debug, FromRow)]
struct RelationshipRow {
    source: String,
    target: String,
    source_name: String,
    target_name: String,
    relationship_type: String,
    context: String,
    strength: f64,
    metadata: String,
}

impl RelationshipRow {
    fn into_relationship(self) -> Result<Relationship> {
        let relationship_type = RelationshipType::parse(&self.relationship_type).ok_or_else(|| {
            GraphError::new(ErrorCode::GetRelationshipsFailed, "Invalid relationship type in store")
                .with_detail("source", &self.source_name)
                .with_detail("target", &self.target_name)
                .with_detail("relationship_type", &self.relationship_type)
        })?;

        let metadata: Metadata = serde_json::from_str(&self.metadata).map_err(|e| {
            GraphError::new(ErrorCode::GetRelationshipsFailed, "Invalid metadata in store")
                .with_detail("source", &self.source_name)
                .with_detail("target", &self.target_name)
                .with_cause(e)
        })?;

        Ok(Relationship {
            source: self.source_name,
            target: self.target_name,
            relationship_type,
            context: self.context,
            strength: self.strength,
            metadata,
        })
    }
}

#[derive(Debug, FromRow)]
struct NeighborRow {
    #[sqlx(flatten)]
    relationship: RelationshipRow,
    distance: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn character(name: &str) -> Entity {
        Entity::new(name, EntityType::Character)
    }

    #[tokio::test]
    async fn test_unsupported_scheme_is_driver_not_available() {
        let mut graph = SqlGraph::new(SqlGraphSettings::new("bolt://localhost:7687"));
        let err = graph.add_entity(&character("Alice")).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::DriverNotAvailable);
        assert!(!graph.health_check().await);
    }

    #[tokio::test]
    async fn test_unreachable_store_is_connection_failed() {
        let dir = tempfile::tempdir().unwrap();
        // a directory cannot be opened as a database file
        let uri = format!("sqlite:{}", dir.path().display());
        let graph = SqlGraph::new(SqlGraphSettings::new(uri));
        let err = graph.get_stats().await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConnectionFailed);
        assert!(err.detail("cause").is_some());
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let dir = tempfile::tempdir().unwrap();
        let uri = format!("sqlite:{}", dir.path().join("graph.db").display());

        let mut first = SqlGraph::new(SqlGraphSettings::new(uri.clone()).with_database("first"));
        let mut second = SqlGraph::new(SqlGraphSettings::new(uri).with_database("second"));

        first.add_entity(&character("Alice")).await.unwrap();
        assert!(second.add_entity(&character("Alice")).await.unwrap());
        second.clear().await.unwrap();

        assert!(first.entity_exists("alice").await.unwrap());
        assert!(!second.entity_exists("alice").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_rows_are_collapsed_on_read() {
        let mut graph = SqlGraph::in_memory();
        graph.add_entity(&character("Alice")).await.unwrap();
        graph
            .add_relationship(&Relationship::new("Alice", "Bob", RelationshipType::Knows))
            .await
            .unwrap();

        // simulate a lost check-then-insert race
        let pool = graph.pool().await.unwrap();
        sqlx::query(
            "INSERT INTO graph_entities (namespace, canonical_name, name, entity_type) \
             VALUES (?, 'alice', 'ALICE', 'character')",
        )
        .bind(graph.namespace())
        .execute(pool)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO graph_relationships (namespace, source, target, source_name, target_name, relationship_type) \
             VALUES (?, 'alice', 'bob', 'Alice', 'Bob', 'knows')",
        )
        .bind(graph.namespace())
        .execute(pool)
        .await
        .unwrap();

        let stats = graph.get_stats().await.unwrap();
        assert_eq!(stats.node_count, 2);
        assert_eq!(stats.edge_count, 1);
        assert_eq!(graph.get_all_entities(None, None).await.unwrap().len(), 2);
        assert_eq!(graph.get_relationships("alice", None).await.unwrap().len(), 1);
        assert_eq!(graph.get_entity("alice").await.unwrap().unwrap().name, "Alice");
    }

    #[tokio::test]
    async fn test_corrupt_json_columns_are_errors() {
        let mut graph = SqlGraph::in_memory();
        graph
            .add_relationship(&Relationship::new("Alice", "Bob", RelationshipType::Knows))
            .await
            .unwrap();

        let pool = graph.pool().await.unwrap();
        sqlx::query("UPDATE graph_entities SET aliases = 'not json' WHERE canonical_name = 'alice'")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("UPDATE graph_relationships SET metadata = '{broken'")
            .execute(pool)
            .await
            .unwrap();

        let err = graph.get_entity("Alice").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::GetEntityFailed);
        assert!(err.detail("cause").is_some());

        let err = graph.get_relationships("Bob", None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::GetRelationshipsFailed);
        assert_eq!(err.detail("source"), Some("Alice"));
    }

    #[tokio::test]
    async fn test_path_search_on_complete_graph_is_fast() {
        let names: Vec<String> = (0..14).map(|i| format!("N{}", i)).collect();
        let mut relationships = Vec::new();
        for a in &names {
            for b in &names {
                if a != b {
                    relationships.push(Relationship::new(a, b, RelationshipType::Knows));
                }
            }
        }
        let mut graph = SqlGraph::in_memory();
        graph.add_relationships(&relationships).await.unwrap();
        graph.add_entity(&character("Island")).await.unwrap();

        let searches = async {
            assert!(graph.find_path("N0", "Island", None).await.unwrap().is_none());
            let all = graph.find_all_shortest_paths("N0", None, None).await.unwrap();
            assert_eq!(all.len(), 13);
            assert!(all.values().all(|p| p.length == 1));
        };
        tokio::time::timeout(std::time::Duration::from_secs(10), searches)
            .await
            .expect("path search on a complete graph took too long");
    }

    #[tokio::test]
    async fn test_settings_debug_redacts_password() {
        let mut settings = SqlGraphSettings::in_memory();
        settings.password = Some("hunter2".to_string());
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("hunter2"));
    }

    #[tokio::test]
    async fn test_path_avoids_cycles_and_respects_bound() {
        let mut graph = SqlGraph::in_memory();
        graph
            .add_relationships(&[
                Relationship::new("A", "B", RelationshipType::Knows),
                Relationship::new("B", "A", RelationshipType::Knows),
                Relationship::new("B", "C", RelationshipType::Knows),
                Relationship::new("C", "D", RelationshipType::Knows),
            ])
            .await
            .unwrap();

        let path = graph.find_path("a", "d", None).await.unwrap().unwrap();
        assert_eq!(path.entities, vec!["A", "B", "C", "D"]);
        assert!(graph.find_path("a", "d", Some(2)).await.unwrap().is_none());

        let all = graph.find_all_shortest_paths("a", None, Some(2)).await.unwrap();
        assert_eq!(all.keys().cloned().collect::<Vec<_>>(), vec!["B", "C"]);
    }
}
