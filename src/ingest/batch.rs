//! Batch ingestor.
//!
//! Experiment-keyed batches (test papers, answered response batches) are
//! checked against the ledger, graded item by item, and only then written in
//! a single transaction. Scored uploads upsert by question id and commit per
//! item. Grading is strictly sequential: one oracle call at a time.

use std::collections::HashSet;

use tracing::{info, instrument, warn};

use crate::core::{Grader, IdForm, IdGenerator, DEFAULT_RETRY_BUDGET};
use crate::domain::{
    Evaluation, EvaluationData, EvaluationRequest, PaperQuestion, RubricScore, ScoreRequest,
};
use crate::error::{EvalError, Result};
use crate::ledger::{Ledger, UpsertResult};

use super::artifact::{Artifact, BatchItem};
use super::resolve::ReferenceStrategy;

/// Experiment used by scored uploads that name no project
pub const DEFAULT_PROJECT: &str = "uploaded_project";

/// What happened to one input item (indexes are 1-based)
#[derive(Debug)]
pub enum ItemOutcome {
    Created {
        index: usize,
        question_id: String,
        total_score: u8,
        /// Set when the row holds the zero fallback score
        degraded: Option<EvalError>,
    },
    Updated {
        index: usize,
        question_id: String,
        total_score: u8,
        degraded: Option<EvalError>,
    },
    Skipped {
        index: usize,
        error: EvalError,
    },
}

impl ItemOutcome {
    pub fn index(&self) -> usize {
        match self {
            ItemOutcome::Created { index, .. }
            | ItemOutcome::Updated { index, .. }
            | ItemOutcome::Skipped { index, .. } => *index,
        }
    }

    /// Why grading fell back to the zero score, if it did
    pub fn degradation(&self) -> Option<&EvalError> {
        match self {
            ItemOutcome::Created { degraded, .. } | ItemOutcome::Updated { degraded, .. } => {
                degraded.as_ref()
            }
            ItemOutcome::Skipped { .. } => None,
        }
    }

    fn from_upsert(index: usize, result: &UpsertResult, degraded: Option<EvalError>) -> Self {
        let evaluation = result.evaluation();
        let question_id = evaluation.data.question_id.clone();
        let total_score = evaluation.data.total_score;
        match result {
            UpsertResult::Created(_) => ItemOutcome::Created {
                index,
                question_id,
                total_score,
                degraded,
            },
            UpsertResult::Updated(_) => ItemOutcome::Updated {
                index,
                question_id,
                total_score,
                degraded,
            },
        }
    }
}

/// Per-item outcomes of one ingestion call, in input order
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Paper created by a test-paper upload
    pub test_paper_id: Option<i64>,

    pub outcomes: Vec<ItemOutcome>,
}

impl IngestReport {
    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Updated { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    /// Rows written to the ledger
    pub fn written(&self) -> usize {
        self.created() + self.updated()
    }

    /// Rows written with the all-zero fallback score
    pub fn degraded(&self) -> usize {
        self.count(|o| o.degradation().is_some())
    }

    fn count(&self, predicate: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(o)).count()
    }

    /// Record an item-level failure; anything else is handed back to abort the batch
    fn skip(&mut self, index: usize, error: EvalError) -> Result<()> {
        if !error.is_item_level() {
            return Err(error);
        }
        warn!(index, kind = error.kind(), %error, "Skipping item");
        self.outcomes.push(ItemOutcome::Skipped { index, error });
        Ok(())
    }

    fn finish(mut self) -> Self {
        self.outcomes.sort_by_key(ItemOutcome::index);
        info!(
            created = self.created(),
            updated = self.updated(),
            skipped = self.skipped(),
            degraded = self.degraded(),
            "Ingestion finished"
        );
        self
    }
}

/// A graded row waiting for the batch transaction
struct Pending {
    index: usize,
    data: EvaluationData,
    paper_question: Option<PaperQuestion>,
    degraded: Option<EvalError>,
}

/// Drives uploads through grading into the ledger
pub struct Ingestor<'a> {
    ledger: &'a Ledger,
    grader: Grader,
    id_retry_budget: u32,
}

impl<'a> Ingestor<'a> {
    pub fn new(ledger: &'a Ledger, grader: Grader) -> Self {
        Self {
            ledger,
            grader,
            id_retry_budget: DEFAULT_RETRY_BUDGET,
        }
    }

    pub fn with_id_retry_budget(mut self, budget: u32) -> Self {
        self.id_retry_budget = budget;
        self
    }

    /// Upload a test paper and grade whatever answers it already carries.
    ///
    /// The paper name doubles as the experiment id. Rows without a response
    /// are stored as ungraded placeholders.
    #[instrument(skip(self, artifact), fields(format = artifact.format()))]
    pub async fn ingest_test_paper(&self, name: &str, artifact: &Artifact) -> Result<IngestReport> {
        require_experiment(name)?;
        let items = artifact.decode()?;
        self.guard_experiment(name)?;

        info!(items = items.len(), oracle = self.grader.oracle_name(), "Ingesting test paper");

        let mut report = IngestReport::default();
        let mut pending = Vec::new();
        let mut assigned = HashSet::new();

        for (offset, item) in items.into_iter().enumerate() {
            let index = offset + 1;
            match self.prepare_paper_row(name, item, &mut assigned).await {
                Ok((data, question, degraded)) => {
                    pending.push(Pending {
                        index,
                        data,
                        paper_question: Some(question),
                        degraded,
                    });
                }
                Err(error) => report.skip(index, error)?,
            }
        }

        let paper_id = self.commit(Some(name), pending, &mut report)?;
        report.test_paper_id = paper_id;
        Ok(report.finish())
    }

    /// Grade an answered batch under a new experiment; create-only
    #[instrument(skip(self, artifact), fields(format = artifact.format()))]
    pub async fn ingest_response_batch(
        &self,
        experiment_id: &str,
        artifact: &Artifact,
        strategy: ReferenceStrategy,
    ) -> Result<IngestReport> {
        require_experiment(experiment_id)?;
        let items = artifact.decode()?;
        self.guard_experiment(experiment_id)?;

        info!(items = items.len(), oracle = self.grader.oracle_name(), "Ingesting response batch");

        let mut report = IngestReport::default();
        let mut pending = Vec::new();

        for (offset, item) in items.into_iter().enumerate() {
            let index = offset + 1;
            match self.prepare_response(experiment_id, item, strategy).await {
                Ok((data, degraded)) => {
                    pending.push(Pending {
                        index,
                        data,
                        paper_question: None,
                        degraded,
                    });
                }
                Err(error) => report.skip(index, error)?,
            }
        }

        self.commit(None, pending, &mut report)?;
        Ok(report.finish())
    }

    /// Grade a scored upload, replacing earlier rows with the same question id
    #[instrument(skip(self, artifact), fields(format = artifact.format()))]
    pub async fn upsert_scored(
        &self,
        project_id: Option<&str>,
        artifact: &Artifact,
    ) -> Result<IngestReport> {
        let experiment_id = project_id
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_PROJECT);
        let items = artifact.decode()?;

        info!(
            items = items.len(),
            experiment_id,
            oracle = self.grader.oracle_name(),
            "Ingesting scored upload"
        );

        let mut report = IngestReport::default();
        let mut assigned = HashSet::new();

        for (offset, item) in items.into_iter().enumerate() {
            let index = offset + 1;
            match self.upsert_item(experiment_id, item, &mut assigned).await {
                Ok((result, degraded)) => {
                    report
                        .outcomes
                        .push(ItemOutcome::from_upsert(index, &result, degraded));
                }
                Err(error) => report.skip(index, error)?,
            }
        }

        Ok(report.finish())
    }

    /// Grade one answer against the StandardAnswer named by its source label
    #[instrument(skip_all, fields(experiment_id = %request.experiment_id))]
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation> {
        let (evaluation, _) = self.evaluate_one(request, &mut HashSet::new()).await?;
        Ok(evaluation)
    }

    /// Grade several single-item requests; failures are reported per request
    #[instrument(skip_all, fields(requests = requests.len()))]
    pub async fn evaluate_many(&self, requests: &[EvaluationRequest]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        let mut assigned = HashSet::new();

        for (offset, request) in requests.iter().enumerate() {
            let index = offset + 1;
            match self.evaluate_one(request, &mut assigned).await {
                Ok((evaluation, degraded)) => {
                    report.outcomes.push(ItemOutcome::Created {
                        index,
                        question_id: evaluation.data.question_id,
                        total_score: evaluation.data.total_score,
                        degraded,
                    });
                }
                Err(error) => report.skip(index, error)?,
            }
        }

        Ok(report.finish())
    }

    async fn prepare_paper_row(
        &self,
        paper_name: &str,
        item: Result<BatchItem>,
        assigned: &mut HashSet<String>,
    ) -> Result<(EvaluationData, PaperQuestion, Option<EvalError>)> {
        let item = item?;
        let question = item
            .question
            .clone()
            .ok_or(EvalError::MissingRequiredField("question"))?;
        let difficulty = item.difficulty()?;
        let reference = item.embedded_reference().unwrap_or_default().to_string();
        let label = item.source_label().unwrap_or_default().to_string();

        if !item.response_text().trim().is_empty() && reference.trim().is_empty() {
            return Err(EvalError::MissingReference(format!(
                "answered question '{}'",
                question
            )));
        }

        let question_id = match &item.question_id {
            Some(id) => {
                assigned.insert(id.clone());
                id.clone()
            }
            None => self.fresh_id(IdForm::Paper, assigned)?,
        };

        let request = ScoreRequest::new(&question_id, &question, item.response_text(), &reference)
            .with_source_label(label);

        let score = if request.has_response() {
            self.grader.score_request(&request).await
        } else {
            RubricScore::ungraded()
        };

        let mut data = EvaluationData::from_scored(paper_name, &request, &score);
        data.difficulty = difficulty;

        let paper_question = PaperQuestion {
            paper_id: 0,
            question_id,
            question,
            standard_answer: reference,
            difficulty,
            source: item.source.clone().unwrap_or_default(),
            tags: item.tags.clone().unwrap_or_default(),
        };

        Ok((data, paper_question, degradation(&score)))
    }

    async fn prepare_response(
        &self,
        experiment_id: &str,
        item: Result<BatchItem>,
        strategy: ReferenceStrategy,
    ) -> Result<(EvaluationData, Option<EvalError>)> {
        let item = item?;
        let question_id = item
            .question_id
            .clone()
            .ok_or(EvalError::MissingRequiredField("question_id"))?;
        let question = item
            .question
            .clone()
            .ok_or(EvalError::MissingRequiredField("question"))?;
        let response = item
            .response
            .clone()
            .ok_or(EvalError::MissingRequiredField("response"))?;

        let reference = strategy.resolve(self.ledger, &item)?;

        let request = ScoreRequest::new(question_id, question, response, reference.standard_answer)
            .with_source_label(reference.source_label)
            .with_supporting_source(reference.supporting_source);
        let score = self.grader.score_request(&request).await;

        let mut data = EvaluationData::from_scored(experiment_id, &request, &score);
        if let Some((paper_id, difficulty)) = reference.paper {
            data.test_paper_id = paper_id.to_string();
            data.difficulty = difficulty;
        }

        Ok((data, degradation(&score)))
    }

    async fn upsert_item(
        &self,
        experiment_id: &str,
        item: Result<BatchItem>,
        assigned: &mut HashSet<String>,
    ) -> Result<(UpsertResult, Option<EvalError>)> {
        let item = item?;
        let question = item
            .question
            .clone()
            .ok_or(EvalError::MissingRequiredField("question"))?;
        let response = item
            .response
            .clone()
            .ok_or(EvalError::MissingRequiredField("response"))?;
        if !item.has_sources() {
            return Err(EvalError::MissingRequiredField("sources"));
        }

        let reference = ReferenceStrategy::SourceLabel.resolve(self.ledger, &item)?;

        let question_id = match &item.question_id {
            Some(id) => id.clone(),
            None => self.fresh_id(IdForm::Short, assigned)?,
        };

        let request = ScoreRequest::new(&question_id, question, response, reference.standard_answer)
            .with_source_label(reference.source_label)
            .with_supporting_source(reference.supporting_source);
        let score = self.grader.score_request(&request).await;

        let data = EvaluationData::from_scored(experiment_id, &request, &score);
        let result = self.ledger.upsert_evaluation(&question_id, &data)?;

        Ok((result, degradation(&score)))
    }

    async fn evaluate_one(
        &self,
        request: &EvaluationRequest,
        assigned: &mut HashSet<String>,
    ) -> Result<(Evaluation, Option<EvalError>)> {
        require_experiment(&request.experiment_id)?;
        if request.question.trim().is_empty() {
            return Err(EvalError::MissingRequiredField("question"));
        }
        if request.response.trim().is_empty() {
            return Err(EvalError::MissingRequiredField("response"));
        }

        let label = request.source.trim();
        let answer = self
            .ledger
            .standard_answer(label)?
            .ok_or_else(|| EvalError::MissingReference(format!("source '{}'", label)))?;

        let question_id = match request
            .question_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
        {
            Some(id) => id.to_string(),
            None => self.fresh_id(IdForm::Short, assigned)?,
        };

        let score_request = ScoreRequest::new(
            question_id,
            &request.question,
            &request.response,
            answer.content,
        )
        .with_source_label(answer.source);
        let score = self.grader.score_request(&score_request).await;

        let data = EvaluationData::from_scored(&request.experiment_id, &score_request, &score);
        let evaluation = self.ledger.create_evaluation(&data)?;

        info!(
            question_id = %evaluation.data.question_id,
            total_score = evaluation.data.total_score,
            "Evaluation stored"
        );
        Ok((evaluation, degradation(&score)))
    }

    /// Write graded rows in one transaction; per-row conflicts are reported
    /// and do not undo their siblings
    fn commit(
        &self,
        paper_name: Option<&str>,
        pending: Vec<Pending>,
        report: &mut IngestReport,
    ) -> Result<Option<i64>> {
        self.ledger.transaction(|ledger| {
            let paper = match paper_name {
                Some(name) => Some(ledger.create_test_paper(name)?),
                None => None,
            };

            for mut row in pending {
                if let Some(paper) = &paper {
                    row.data.test_paper_id = paper.id.to_string();
                }

                match ledger.create_evaluation(&row.data) {
                    Ok(evaluation) => {
                        if let (Some(paper), Some(mut question)) = (&paper, row.paper_question) {
                            question.paper_id = paper.id;
                            ledger.add_paper_question(&question)?;
                        }
                        report.outcomes.push(ItemOutcome::Created {
                            index: row.index,
                            question_id: evaluation.data.question_id,
                            total_score: evaluation.data.total_score,
                            degraded: row.degraded,
                        });
                    }
                    Err(error @ EvalError::Conflict { .. }) => report.skip(row.index, error)?,
                    Err(error) => return Err(error),
                }
            }

            Ok(paper.map(|p| p.id))
        })
    }

    fn guard_experiment(&self, experiment_id: &str) -> Result<()> {
        if self.ledger.experiment_exists(experiment_id)? {
            warn!(experiment_id, "Experiment already has evaluations, rejecting batch");
            return Err(EvalError::DuplicateExperiment(experiment_id.to_string()));
        }
        Ok(())
    }

    fn fresh_id(&self, form: IdForm, assigned: &mut HashSet<String>) -> Result<String> {
        let id = IdGenerator::new(form)
            .with_max_attempts(self.id_retry_budget)
            .generate(|candidate| {
                Ok(assigned.contains(candidate) || self.ledger.question_id_taken(candidate)?)
            })?;
        assigned.insert(id.clone());
        Ok(id)
    }
}

/// Diagnostic for an item persisted with the zero fallback score
fn degradation(score: &RubricScore) -> Option<EvalError> {
    score.error.clone().map(EvalError::OracleParseFailure)
}

fn require_experiment(experiment_id: &str) -> Result<()> {
    if experiment_id.trim().is_empty() {
        return Err(EvalError::MissingRequiredField("experiment_id"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{Oracle, OracleOutput};
    use crate::domain::StandardAnswer;
    use crate::ledger::EvaluationFilter;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Replies with a fixed rubric and counts calls
    struct FixedOracle {
        reply: String,
        calls: Mutex<usize>,
    }

    impl FixedOracle {
        fn new(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: reply.to_string(),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl Oracle for FixedOracle {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(
            &self,
            _system: &str,
            _prompt: &str,
            _timeout: Duration,
        ) -> anyhow::Result<OracleOutput> {
            *self.calls.lock().unwrap() += 1;
            Ok(OracleOutput::new(self.reply.clone()))
        }

        async fn health_check(&self) -> anyhow::Result<()> {
            Ok(())
        }
    }

    const GOOD: &str = r#"{"accuracy":4,"relevance":5,"logic":4,"conciseness":3,"language_quality":4,"total_score":99,"overall_comment":"ok"}"#;

    fn csv(body: &str) -> Artifact {
        Artifact::from_bytes("upload.csv", body).unwrap()
    }

    #[test]
    fn test_report_counts_and_order() {
        let mut report = IngestReport::default();
        report.outcomes.push(ItemOutcome::Created {
            index: 3,
            question_id: "c".to_string(),
            total_score: 20,
            degraded: None,
        });
        report
            .skip(1, EvalError::MissingRequiredField("question"))
            .unwrap();
        report.outcomes.push(ItemOutcome::Updated {
            index: 2,
            question_id: "b".to_string(),
            total_score: 0,
            degraded: Some(EvalError::OracleParseFailure("expected value".to_string())),
        });

        let report = report.finish();
        let order: Vec<usize> = report.outcomes.iter().map(ItemOutcome::index).collect();
        assert_eq!(order, vec![1, 2, 3]);
        assert_eq!(report.written(), 2);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.degraded(), 1);
    }

    #[test]
    fn test_batch_level_errors_are_not_skipped() {
        let mut report = IngestReport::default();
        let err = report
            .skip(1, EvalError::DuplicateExperiment("exp".to_string()))
            .unwrap_err();
        assert!(matches!(err, EvalError::DuplicateExperiment(_)));
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_paper_rows_without_response_skip_the_oracle() {
        let ledger = Ledger::open_in_memory().unwrap();
        let oracle = FixedOracle::new(GOOD);
        let ingestor = Ingestor::new(&ledger, Grader::new(oracle.clone()));

        let report = ingestor
            .ingest_test_paper(
                "Midterm A",
                &csv("question,standard_answer,difficulty,source,tags\n\
                      What is the capital of France?,Paris,2,Midterm A,geography\n\
                      Who wrote Hamlet?,William Shakespeare,,Midterm A,literature\n"),
            )
            .await
            .unwrap();

        assert_eq!(oracle.calls(), 0);
        assert_eq!(report.created(), 2);

        let paper_id = report.test_paper_id.unwrap();
        let questions = ledger.paper_questions(paper_id).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].difficulty, 2);
        assert_eq!(questions[1].difficulty, 3);
        assert_eq!(questions[0].question_id.len(), 8);

        let rows = ledger
            .list_evaluations(&EvaluationFilter::default().experiment("Midterm A"))
            .unwrap();
        assert!(rows.iter().all(|r| r.data.total_score == 0 && r.data.bot_response.is_empty()));
        assert!(rows.iter().all(|r| r.data.test_paper_id == paper_id.to_string()));
    }

    #[tokio::test]
    async fn test_answered_paper_row_is_graded() {
        let ledger = Ledger::open_in_memory().unwrap();
        let oracle = FixedOracle::new(GOOD);
        let ingestor = Ingestor::new(&ledger, Grader::new(oracle.clone()));

        let report = ingestor
            .ingest_test_paper(
                "Quiz",
                &csv("question_id,question,standard_answer,response\n\
                      q1,What is 2+2?,4,Four\n\
                      q2,What is 3+3?,,Six\n"),
            )
            .await
            .unwrap();

        assert_eq!(oracle.calls(), 1);
        assert_eq!(report.created(), 1);
        assert!(matches!(
            report.outcomes[1],
            ItemOutcome::Skipped {
                index: 2,
                error: EvalError::MissingReference(_)
            }
        ));
        assert_eq!(ledger.get_evaluation("q1").unwrap().data.total_score, 20);
    }

    #[tokio::test]
    async fn test_response_batch_with_paper_reference() {
        let ledger = Ledger::open_in_memory().unwrap();
        let ingestor = Ingestor::new(&ledger, Grader::new(FixedOracle::new(GOOD)));

        ingestor
            .ingest_test_paper(
                "Midterm A",
                &csv("question_id,question,standard_answer,difficulty\nq1,What is AI?,Artificial Intelligence,5\n"),
            )
            .await
            .unwrap();

        let report = ingestor
            .ingest_response_batch(
                "run-1",
                &csv("question_id,question,response,source\nq1,What is AI?,Machines that think,\n"),
                ReferenceStrategy::PaperQuestion,
            )
            .await
            .unwrap();
        assert_eq!(report.created(), 1);

        let row = &ledger
            .list_evaluations(&EvaluationFilter::default().experiment("run-1"))
            .unwrap()[0];
        assert_eq!(row.data.standard_answer, "Artificial Intelligence");
        assert_eq!(row.data.difficulty, 5);
        assert_eq!(row.data.total_score, 20);
    }

    #[tokio::test]
    async fn test_duplicate_question_in_batch_is_conflict() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .put_standard_answer(&StandardAnswer::new("Wikipedia", "Artificial Intelligence"))
            .unwrap();
        let ingestor = Ingestor::new(&ledger, Grader::new(FixedOracle::new(GOOD)));

        let report = ingestor
            .ingest_response_batch(
                "exp-1",
                &csv("question_id,question,response,source\n\
                      q1,What is AI?,Thinking machines,Wikipedia\n\
                      q1,What is AI?,Again,Wikipedia\n\
                      q2,What is ML?,Learning from data,Wikipedia\n"),
                ReferenceStrategy::SourceLabel,
            )
            .await
            .unwrap();

        assert_eq!(report.created(), 2);
        assert!(matches!(
            report.outcomes[1],
            ItemOutcome::Skipped {
                error: EvalError::Conflict { .. },
                ..
            }
        ));
        assert_eq!(
            ledger
                .list_evaluations(&EvaluationFilter::default().experiment("exp-1"))
                .unwrap()
                .len(),
            2
        );
    }

    #[tokio::test]
    async fn test_evaluate_requires_known_source() {
        let ledger = Ledger::open_in_memory().unwrap();
        let ingestor = Ingestor::new(&ledger, Grader::new(FixedOracle::new(GOOD)));

        let request = EvaluationRequest::new("exp", "What is AI?", "Machines", "Wikipedia");
        assert!(matches!(
            ingestor.evaluate(&request).await,
            Err(EvalError::MissingReference(_))
        ));

        ledger
            .put_standard_answer(&StandardAnswer::new("Wikipedia", "Artificial Intelligence"))
            .unwrap();
        let evaluation = ingestor.evaluate(&request).await.unwrap();
        assert_eq!(evaluation.data.question_id.len(), 6);
        assert_eq!(evaluation.data.standard_answer, "Artificial Intelligence");
        assert_eq!(evaluation.data.question_source, "Wikipedia");

        let again = request.clone().with_question_id(evaluation.data.question_id.clone());
        assert!(matches!(
            ingestor.evaluate(&again).await,
            Err(EvalError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_evaluate_many_reports_per_request() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .put_standard_answer(&StandardAnswer::new("Wikipedia", "Artificial Intelligence"))
            .unwrap();
        let ingestor = Ingestor::new(&ledger, Grader::new(FixedOracle::new(GOOD)));

        let requests = vec![
            EvaluationRequest::new("exp", "What is AI?", "Machines", "Wikipedia"),
            EvaluationRequest::new("exp", "What is AI?", "", "Wikipedia"),
            EvaluationRequest::new("exp", "What is AI?", "Machines", "Unknown"),
        ];
        let report = ingestor.evaluate_many(&requests).await.unwrap();

        assert_eq!(report.created(), 1);
        assert_eq!(report.skipped(), 2);
    }

    #[tokio::test]
    async fn test_scored_upload_defaults_project_and_generates_id() {
        let ledger = Ledger::open_in_memory().unwrap();
        ledger
            .put_standard_answer(&StandardAnswer::new("Wikipedia", "Artificial Intelligence"))
            .unwrap();
        let ingestor =
            Ingestor::new(&ledger, Grader::new(FixedOracle::new(GOOD))).with_id_retry_budget(0);

        // A zero budget is raised to one draw, which succeeds on an empty ledger
        let report = ingestor
            .upsert_scored(
                None,
                &Artifact::from_bytes(
                    "scored.json",
                    r#"[{"question":"What is AI?","response":"Machines","sources":"Wikipedia"}]"#,
                )
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(report.created(), 1);
        assert!(ledger.experiment_exists(DEFAULT_PROJECT).unwrap());
    }
}
