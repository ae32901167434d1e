//! Persistence of segmented and annotated works.
//!
//! Authors and texts are get-or-create. Re-ingesting a text removes all of
//! its divisions first (lines, sentences and links cascade), then writes each
//! division with its lines, sentences and links in its own transaction.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use textus_segmenter::annotation::SentenceAnnotation;
use textus_segmenter::{Division, LineId, Sentence, SegmentedWork, Token};

use crate::annotation::AnnotationRun;
use crate::error::{PipelineError, Result};
use crate::models::{AnnotationStatus, AuthorRecord, StoredWork, TextRecord, TextStatus};

/// Rows per multi-row insert; stays well below the bind parameter limit.
const INSERT_CHUNK: usize = 1000;

/// A work ready to be written.
#[derive(Debug, Clone)]
pub struct AnnotatedWork {
    pub work: SegmentedWork,
    /// Hex SHA-256 of the ingested source text.
    pub content_hash: String,
    pub annotations: AnnotationRun,
}

impl AnnotatedWork {
    /// Status the text ends up with once every division is written.
    pub fn final_status(&self) -> TextStatus {
        if self.annotations.is_complete() {
            TextStatus::Ingested
        } else {
            TextStatus::Partial
        }
    }

    fn sentence_status(&self, sentence_index: usize) -> AnnotationStatus {
        if self.annotations.sentences.contains_key(&sentence_index) {
            AnnotationStatus::Annotated
        } else if self
            .annotations
            .failures
            .iter()
            .any(|f| f.sentence_index == sentence_index)
        {
            AnnotationStatus::Failed
        } else {
            AnnotationStatus::Pending
        }
    }
}

#[async_trait]
pub trait CorpusStore: Send + Sync {
    /// Replace everything stored for the work's text.
    async fn store_work(&self, work: &AnnotatedWork) -> Result<StoredWork>;
}

fn to_i32(value: usize, what: &str) -> Result<i32> {
    i32::try_from(value)
        .map_err(|_| PipelineError::InvalidInput(format!("{what} {value} out of range")))
}

#[tracing::instrument(skip(executor))]
pub async fn get_or_create_author<'e, E>(
    executor: E,
    author_ref: &str,
    name: &str,
) -> Result<AuthorRecord>
where
    E: sqlx::PgExecutor<'e>,
{
    let author = sqlx::query_as::<_, AuthorRecord>(
        r#"
        INSERT INTO authors (author_ref, name)
        VALUES ($1, $2)
        ON CONFLICT (author_ref) DO UPDATE SET name = EXCLUDED.name
        RETURNING *
        "#,
    )
    .bind(author_ref)
    .bind(name)
    .fetch_one(executor)
    .await?;

    Ok(author)
}

/// Get or create a text and mark it as being ingested.
#[tracing::instrument(skip(executor, schema_levels))]
pub async fn get_or_create_text<'e, E>(
    executor: E,
    author_id: Uuid,
    work_ref: &str,
    name: &str,
    schema_levels: &[String],
    content_hash: &str,
) -> Result<TextRecord>
where
    E: sqlx::PgExecutor<'e>,
{
    let text = sqlx::query_as::<_, TextRecord>(
        r#"
        INSERT INTO texts (author_id, work_ref, name, schema_levels, content_hash)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (author_id, work_ref) DO UPDATE
        SET name = EXCLUDED.name,
            schema_levels = EXCLUDED.schema_levels,
            content_hash = EXCLUDED.content_hash,
            status = 'ingesting',
            updated_at = now()
        RETURNING *
        "#,
    )
    .bind(author_id)
    .bind(work_ref)
    .bind(name)
    .bind(Json(schema_levels))
    .bind(content_hash)
    .fetch_one(executor)
    .await?;

    Ok(text)
}

#[tracing::instrument(skip(executor))]
pub async fn find_text<'e, E>(
    executor: E,
    author_ref: &str,
    work_ref: &str,
) -> Result<Option<TextRecord>>
where
    E: sqlx::PgExecutor<'e>,
{
    let text = sqlx::query_as::<_, TextRecord>(
        r#"
        SELECT t.* FROM texts t
        JOIN authors a ON a.id = t.author_id
        WHERE a.author_ref = $1 AND t.work_ref = $2
        "#,
    )
    .bind(author_ref)
    .bind(work_ref)
    .fetch_optional(executor)
    .await?;

    Ok(text)
}

/// Remove all divisions of a text. Returns the number of divisions removed.
#[tracing::instrument(skip(executor))]
pub async fn clear_text<'e, E>(executor: E, text_id: Uuid) -> Result<u64>
where
    E: sqlx::PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM divisions WHERE text_id = $1")
        .bind(text_id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

#[tracing::instrument(skip(executor))]
pub async fn set_text_status<'e, E>(executor: E, text_id: Uuid, status: TextStatus) -> Result<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query("UPDATE texts SET status = $2, updated_at = now() WHERE id = $1")
        .bind(text_id)
        .bind(status)
        .execute(executor)
        .await?;

    Ok(())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct DivisionCounts {
    lines: usize,
    sentences: usize,
    links: usize,
}

struct LineRow {
    line_ref: i32,
    number: Option<i32>,
    content: String,
    is_title: bool,
    citation: Option<String>,
    tokens: Vec<Token>,
    categories: BTreeSet<String>,
}

struct SentenceRow {
    sentence_index: i32,
    content: String,
    start_offset: i32,
    end_offset: i32,
    tokens: Vec<Token>,
    categories: BTreeSet<String>,
    status: AnnotationStatus,
}

/// Write one division with its lines, sentences and links atomically.
#[tracing::instrument(skip(pool, division, sentences, work), fields(citation = %division.citation))]
async fn write_division(
    pool: &PgPool,
    text_id: Uuid,
    ordinal: usize,
    division: &Division,
    sentences: &[&Sentence],
    work: &AnnotatedWork,
) -> Result<DivisionCounts> {
    let mut tx = pool.begin().await?;

    let division_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO divisions (text_id, ordinal, volume, chapter, section, fragment, title, citation)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(text_id)
    .bind(to_i32(ordinal, "division ordinal")?)
    .bind(&division.fields.volume)
    .bind(&division.fields.chapter)
    .bind(&division.fields.section)
    .bind(&division.fields.fragment)
    .bind(&division.fields.title)
    .bind(&division.citation)
    .fetch_one(&mut *tx)
    .await?;

    let line_rows = division
        .lines
        .iter()
        .map(|line| {
            let annotation = work.annotations.lines.line(line.id);
            Ok(LineRow {
                line_ref: to_i32(line.id.0, "line id")?,
                number: line.number.map(|n| to_i32(n as usize, "line number")).transpose()?,
                content: line.content.clone(),
                is_title: line.is_title,
                citation: line.citation.clone(),
                tokens: annotation.as_ref().map(|a| a.tokens.clone()).unwrap_or_default(),
                categories: annotation.map(|a| a.categories).unwrap_or_default(),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut line_ids: HashMap<i32, Uuid> = HashMap::with_capacity(line_rows.len());
    for chunk in line_rows.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO lines (division_id, line_ref, number, content, is_title, citation, tokens, categories) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(division_id)
                .push_bind(row.line_ref)
                .push_bind(row.number)
                .push_bind(row.content.clone())
                .push_bind(row.is_title)
                .push_bind(row.citation.clone())
                .push_bind(Json(row.tokens.clone()))
                .push_bind(Json(row.categories.clone()));
        });
        builder.push(" RETURNING id, line_ref");

        let inserted: Vec<(Uuid, i32)> = builder.build_query_as().fetch_all(&mut *tx).await?;
        line_ids.extend(inserted.into_iter().map(|(id, line_ref)| (line_ref, id)));
    }

    let sentence_rows = sentences
        .iter()
        .map(|sentence| {
            let annotation: Option<&SentenceAnnotation> =
                work.annotations.sentences.get(&sentence.index);
            Ok(SentenceRow {
                sentence_index: to_i32(sentence.index, "sentence index")?,
                content: sentence.content.clone(),
                start_offset: to_i32(sentence.start_offset, "sentence offset")?,
                end_offset: to_i32(sentence.end_offset, "sentence offset")?,
                tokens: annotation.map(|a| a.tokens.clone()).unwrap_or_default(),
                categories: annotation.map(|a| a.categories.clone()).unwrap_or_default(),
                status: work.sentence_status(sentence.index),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut sentence_ids: HashMap<i32, Uuid> = HashMap::with_capacity(sentence_rows.len());
    for chunk in sentence_rows.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO sentences (division_id, sentence_index, content, start_offset, end_offset, tokens, categories, annotation_status) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(division_id)
                .push_bind(row.sentence_index)
                .push_bind(row.content.clone())
                .push_bind(row.start_offset)
                .push_bind(row.end_offset)
                .push_bind(Json(row.tokens.clone()))
                .push_bind(Json(row.categories.clone()))
                .push_bind(row.status);
        });
        builder.push(" RETURNING id, sentence_index");

        let inserted: Vec<(Uuid, i32)> = builder.build_query_as().fetch_all(&mut *tx).await?;
        sentence_ids.extend(inserted.into_iter().map(|(id, index)| (index, id)));
    }

    let mut link_rows = Vec::new();
    for sentence in sentences {
        let sentence_id = sentence_ids
            .get(&to_i32(sentence.index, "sentence index")?)
            .copied()
            .ok_or_else(|| {
                PipelineError::InvalidInput(format!("sentence {} was not stored", sentence.index))
            })?;
        for link in &sentence.links {
            let line_id = line_ids
                .get(&to_i32(link.line_id.0, "line id")?)
                .copied()
                .ok_or_else(|| {
                    PipelineError::InvalidInput(format!(
                        "sentence {} links to line {} outside its division",
                        sentence.index, link.line_id
                    ))
                })?;
            link_rows.push((
                line_id,
                sentence_id,
                to_i32(link.start, "link offset")?,
                to_i32(link.end, "link offset")?,
                to_i32(link.sentence_offset, "link offset")?,
            ));
        }
    }

    for chunk in link_rows.chunks(INSERT_CHUNK) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO line_sentence_links (line_id, sentence_id, char_start, char_end, sentence_offset) ",
        );
        builder.push_values(chunk, |mut b, row| {
            b.push_bind(row.0)
                .push_bind(row.1)
                .push_bind(row.2)
                .push_bind(row.3)
                .push_bind(row.4);
        });
        builder.build().execute(&mut *tx).await?;
    }

    tx.commit().await?;

    Ok(DivisionCounts {
        lines: line_rows.len(),
        sentences: sentence_rows.len(),
        links: link_rows.len(),
    })
}

/// Postgres-backed corpus store.
#[derive(Debug, Clone)]
pub struct PgCorpusStore {
    pool: PgPool,
}

impl PgCorpusStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CorpusStore for PgCorpusStore {
    #[tracing::instrument(skip(self, work), fields(author_id = %work.work.tree.author_id, work_id = %work.work.tree.work_id))]
    async fn store_work(&self, work: &AnnotatedWork) -> Result<StoredWork> {
        let tree = &work.work.tree;

        let author = get_or_create_author(&self.pool, &tree.author_id, &tree.author_name).await?;
        let text = get_or_create_text(
            &self.pool,
            author.id,
            &tree.work_id,
            &tree.work_name,
            &tree.schema,
            &work.content_hash,
        )
        .await?;

        let removed = clear_text(&self.pool, text.id).await?;
        if removed > 0 {
            tracing::debug!(text_id = %text.id, removed, "removed previous divisions");
        }

        let mut stored = StoredWork {
            text_id: text.id,
            divisions: 0,
            lines: 0,
            sentences: 0,
            links: 0,
        };

        for (ordinal, division) in tree.divisions.iter().enumerate() {
            let sentences: Vec<&Sentence> = work
                .work
                .sentences
                .iter()
                .filter(|s| s.division == ordinal)
                .collect();

            match write_division(&self.pool, text.id, ordinal, division, &sentences, work).await {
                Ok(counts) => {
                    stored.divisions += 1;
                    stored.lines += counts.lines;
                    stored.sentences += counts.sentences;
                    stored.links += counts.links;
                }
                Err(e) => {
                    if let Err(status_err) =
                        set_text_status(&self.pool, text.id, TextStatus::Failed).await
                    {
                        tracing::warn!(error = %status_err, "failed to mark text as failed");
                    }
                    return Err(e);
                }
            }
        }

        set_text_status(&self.pool, text.id, work.final_status()).await?;
        Ok(stored)
    }
}

/// Line ids of a stored text in source order, for checks after ingestion.
pub async fn stored_line_refs(pool: &PgPool, text_id: Uuid) -> Result<Vec<LineId>> {
    let refs: Vec<i32> = sqlx::query_scalar(
        r#"
        SELECT l.line_ref FROM lines l
        JOIN divisions d ON d.id = l.division_id
        WHERE d.text_id = $1
        ORDER BY l.line_ref
        "#,
    )
    .bind(text_id)
    .fetch_all(pool)
    .await?;

    refs.into_iter()
        .map(|r| {
            usize::try_from(r)
                .map(LineId)
                .map_err(|_| PipelineError::InvalidInput(format!("negative line ref {r}")))
        })
        .collect()
}

/// Test utilities for the corpus store.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_support {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory store keeping the counts of the last write per work.
    #[derive(Default)]
    pub struct MemoryStore {
        works: Mutex<BTreeMap<(String, String), (StoredWork, TextStatus)>>,
        failing: Vec<String>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Fail every write for the given work id.
        pub fn failing_for(mut self, work_id: impl Into<String>) -> Self {
            self.failing.push(work_id.into());
            self
        }

        pub fn stored(&self, author_id: &str, work_id: &str) -> Option<(StoredWork, TextStatus)> {
            self.works
                .lock()
                .ok()?
                .get(&(author_id.to_string(), work_id.to_string()))
                .copied()
        }

        pub fn len(&self) -> usize {
            self.works.lock().map(|w| w.len()).unwrap_or(0)
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    #[async_trait]
    impl CorpusStore for MemoryStore {
        async fn store_work(&self, work: &AnnotatedWork) -> Result<StoredWork> {
            let tree = &work.work.tree;
            if self.failing.contains(&tree.work_id) {
                return Err(PipelineError::InvalidInput(format!(
                    "store unavailable for {}",
                    tree.work_id
                )));
            }

            let mut works = self
                .works
                .lock()
                .map_err(|e| PipelineError::InvalidInput(format!("store lock poisoned: {e}")))?;
            let key = (tree.author_id.clone(), tree.work_id.clone());
            let text_id = works
                .get(&key)
                .map(|(stored, _)| stored.text_id)
                .unwrap_or_else(Uuid::new_v4);

            let stored = StoredWork {
                text_id,
                divisions: tree.divisions.len(),
                lines: tree.line_count(),
                sentences: work.work.sentences.len(),
                links: work.work.sentences.iter().map(|s| s.links.len()).sum(),
            };
            works.insert(key, (stored, work.final_status()));
            Ok(stored)
        }
    }
}
