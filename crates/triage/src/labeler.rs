//! Area label prediction for issues and pull requests.
//!
//! The [`Labeler`] gathers what the model needs (title, body, author and, for
//! pull requests, the changed file paths), asks the [`LabelPredictor`] for
//! scores, and ranks the result. Optionally it applies the best label when the
//! model is confident enough and no area label is present yet.

use tracing::{debug, info, instrument};

use crate::{
    Issue, IssueNumber, IssueTracker, LabelPrediction, LabelPredictor, LabelSuggestion,
    PredictionInput, PullRequestManager, RepositoryRef, TriageError,
};

/// Tunables for ranking and applying predictions.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelerSettings {
    /// Minimum score for the best prediction to be applied.
    pub threshold: f64,
    /// Number of predictions kept in a suggestion.
    pub max_suggestions: usize,
    /// Labels starting with this prefix count as area labels.
    pub area_prefix: String,
}

impl Default for LabelerSettings {
    fn default() -> Self {
        Self {
            threshold: 0.4,
            max_suggestions: 3,
            area_prefix: "area-".into(),
        }
    }
}

/// Result of [`Labeler::predict_and_apply`].
#[derive(Debug, Clone, PartialEq)]
pub struct LabelOutcome {
    pub suggestion: LabelSuggestion,
    /// The label added to the issue, if one was.
    pub applied: Option<String>,
}

pub struct Labeler<G, P> {
    github: G,
    predictor: P,
    settings: LabelerSettings,
}

impl<G, P> Labeler<G, P>
where
    G: IssueTracker + PullRequestManager,
    P: LabelPredictor,
{
    pub fn new(github: G, predictor: P, settings: LabelerSettings) -> Self {
        Self {
            github,
            predictor,
            settings,
        }
    }

    pub fn github(&self) -> &G {
        &self.github
    }

    pub fn predictor(&self) -> &P {
        &self.predictor
    }

    /// Predicts area labels for issue or pull request `number`.
    #[instrument(skip_all, fields(repo = %repo, issue = %number))]
    pub async fn predict(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
    ) -> Result<LabelSuggestion, TriageError> {
        let issue = self.github.get_issue(repo, number).await?;
        self.predict_issue(repo, &issue).await
    }

    /// Predicts and, when `apply` is set, labels the item.
    #[instrument(skip_all, fields(repo = %repo, issue = %number, apply = apply))]
    pub async fn predict_and_apply(
        &self,
        repo: &RepositoryRef,
        number: IssueNumber,
        apply: bool,
    ) -> Result<LabelOutcome, TriageError> {
        let issue = self.github.get_issue(repo, number).await?;
        let suggestion = self.predict_issue(repo, &issue).await?;
        let applied = if apply {
            self.apply(repo, &issue, &suggestion).await?
        } else {
            None
        };
        Ok(LabelOutcome {
            suggestion,
            applied,
        })
    }

    /// Adds the best predicted label to `issue` when it clears the threshold
    /// and the issue has no area label yet. Returns the label added.
    pub async fn apply(
        &self,
        repo: &RepositoryRef,
        issue: &Issue,
        suggestion: &LabelSuggestion,
    ) -> Result<Option<String>, TriageError> {
        let Some(best) = suggestion.best() else {
            debug!("No predictions to apply");
            return Ok(None);
        };
        if best.score.as_f64() < self.settings.threshold {
            debug!(label = %best.label, score = %best.score, "Best prediction below threshold");
            return Ok(None);
        }
        if let Some(existing) = issue
            .labels
            .iter()
            .find(|l| l.starts_with(&self.settings.area_prefix))
        {
            debug!(existing = %existing, "Issue already has an area label");
            return Ok(None);
        }

        self.github
            .add_labels(repo, issue.number, std::slice::from_ref(&best.label))
            .await?;
        info!(label = %best.label, score = %best.score, "Applied label");
        Ok(Some(best.label.clone()))
    }

    /// Sorts predictions best first, keeps the highest score per label, and
    /// truncates to `max_suggestions`.
    pub fn rank(&self, mut predictions: Vec<LabelPrediction>) -> Vec<LabelPrediction> {
        predictions.sort_by(|a, b| b.score.as_f64().total_cmp(&a.score.as_f64()));
        let mut ranked: Vec<LabelPrediction> = Vec::with_capacity(self.settings.max_suggestions);
        for prediction in predictions {
            if ranked.len() == self.settings.max_suggestions {
                break;
            }
            if ranked.iter().all(|p| p.label != prediction.label) {
                ranked.push(prediction);
            }
        }
        ranked
    }

    async fn predict_issue(
        &self,
        repo: &RepositoryRef,
        issue: &Issue,
    ) -> Result<LabelSuggestion, TriageError> {
        let input = self.build_input(repo, issue).await?;
        let predictions = self.predictor.predict(&input).await?;
        let predictions = self.rank(predictions);

        if let Some(best) = predictions.first() {
            info!(label = %best.label, score = %best.score, candidates = predictions.len(), "Predicted labels");
        } else {
            info!("Model returned no predictions");
        }

        Ok(LabelSuggestion {
            repo: repo.clone(),
            number: issue.number,
            predictions,
        })
    }

    async fn build_input(
        &self,
        repo: &RepositoryRef,
        issue: &Issue,
    ) -> Result<PredictionInput, TriageError> {
        if !issue.is_pull_request {
            return Ok(PredictionInput {
                repo: repo.clone(),
                number: issue.number,
                title: issue.title.clone(),
                body: issue.body.clone().unwrap_or_default(),
                author: issue.author.clone(),
                is_pull_request: false,
                file_paths: Vec::new(),
            });
        }

        let pr = self.github.get_pull_request(repo, issue.number).await?;
        let files = self.github.get_pull_request_files(repo, issue.number).await?;
        debug!(files = files.len(), "Loaded pull request files");

        Ok(PredictionInput {
            repo: repo.clone(),
            number: issue.number,
            title: pr.title,
            body: pr.body.unwrap_or_default(),
            author: pr.author.or_else(|| issue.author.clone()),
            is_pull_request: true,
            file_paths: files.into_iter().map(|f| f.filename).collect(),
        })
    }
}
