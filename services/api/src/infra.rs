use metrics_exporter_prometheus::PrometheusHandle;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use survey_insights::error::AppError;
use survey_insights::surveys::{
    InMemorySurveyStore, SurveyId, SurveyServiceError, SurveySnapshot,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Reads a `{survey, questions, responses}` snapshot into a fresh store.
pub(crate) fn load_snapshot<P: AsRef<Path>>(
    path: P,
) -> Result<(InMemorySurveyStore, SurveyId), AppError> {
    let reader = BufReader::new(File::open(path)?);
    let snapshot: SurveySnapshot =
        serde_json::from_reader(reader).map_err(std::io::Error::from)?;
    let survey_id = snapshot.survey.id.clone();
    let store = InMemorySurveyStore::from_snapshot(snapshot).map_err(SurveyServiceError::from)?;
    Ok((store, survey_id))
}

/// Writes one survey out in the same shape [`load_snapshot`] reads.
pub(crate) fn save_snapshot<P: AsRef<Path>>(
    store: &InMemorySurveyStore,
    survey_id: &SurveyId,
    path: P,
) -> Result<(), AppError> {
    let snapshot = store
        .snapshot(survey_id)
        .map_err(SurveyServiceError::from)?;
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &snapshot).map_err(std::io::Error::from)?;
    writer.flush()?;
    Ok(())
}
