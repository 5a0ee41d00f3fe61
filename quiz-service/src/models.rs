use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilterOptions {
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub certifications: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizMovie {
    pub id: String,
    pub title: String,
    /// TMDB poster path such as `/abc.jpg`, not a full URL
    pub poster_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitGuessRequest {
    pub movie_id: Option<String>,
    pub guess: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuessResponse {
    pub movie_id: String,
    pub user_guess: String,
    pub prediction: String,
    pub actual_result: String,
    pub is_correct: bool,
    pub feedback_message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
