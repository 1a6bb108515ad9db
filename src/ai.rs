use serde::{Deserialize, Serialize};
use thiserror::Error;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const GEMINI_MODEL: &str = "gemini-pro";

#[derive(Error, Debug)]
pub enum AiServiceError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("Failed to build HTTP client: {0}")]
    ClientInit(#[from] reqwest::Error),
}

/// A generated word of the day with its study material.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WordData {
    pub word: String,
    pub meaning: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
    #[serde(default)]
    pub antonyms: Vec<String>,
    pub example_sentence: String,
    pub rephrased_meaning: String,
}

/// A single multiple-choice question. `correct_answer` matches one of the
/// four entries in `options` verbatim.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

// Request/response shapes for the generateContent REST endpoint.

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Client for the Gemini text-generation API.
///
/// Constructed once at startup and shared across requests. Content calls
/// never fail: any transport, parse, or shape problem falls back to canned
/// study material so the page can always render.
pub struct GeminiService {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiService {
    /// Fails fast when no usable API key is supplied or the HTTP client
    /// cannot be built. These errors propagate so the caller can disable
    /// AI-backed features for the rest of the process lifetime.
    pub fn new(api_key: &str) -> Result<Self, AiServiceError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(AiServiceError::MissingApiKey);
        }

        let client = reqwest::Client::builder().build()?;

        Ok(GeminiService {
            client,
            api_key: api_key.to_string(),
            model: GEMINI_MODEL.to_string(),
        })
    }

    /// Generates a personalized word of the day. Never fails; malformed or
    /// missing model output yields the fixed fallback record.
    pub async fn generate_daily_word(&self, interests: &str, difficulty: &str) -> WordData {
        let prompt = format!(
            "Generate a unique English word that would be interesting for someone \
             interested in {interests} at a {difficulty} difficulty level. \
             Provide the following details in a JSON format:\n\
             {{\n    \"word\": \"\",\n    \"meaning\": \"\",\n    \"synonyms\": [],\n    \
             \"antonyms\": [],\n    \"example_sentence\": \"\",\n    \"rephrased_meaning\": \"\"\n}}\n\
             Return ONLY the raw JSON object with no markdown formatting and no additional text."
        );

        match self.generate_text(&prompt).await.as_deref().and_then(parse_word_response) {
            Some(word_data) => word_data,
            None => {
                log::warn!("Daily word generation failed, serving fallback word");
                fallback_word()
            }
        }
    }

    /// Generates 3 multiple-choice questions about `word`. Never fails; any
    /// response that is not a JSON array of well-formed questions (all three
    /// keys, exactly 4 options, answer among the options) yields the canned
    /// fallback questions.
    pub async fn generate_quiz_questions(&self, word: &str) -> Vec<QuizQuestion> {
        let prompt = format!(
            "Create 3 multiple-choice quiz questions about the word '{word}' \
             that test different aspects of understanding. Each question must have \
             exactly 4 options. Format each question as a JSON object with:\n\
             {{\n    \"question\": \"\",\n    \"options\": [],\n    \"correct_answer\": \"\"\n}}\n\
             Return ONLY a raw JSON array of the 3 question objects with no markdown \
             formatting and no additional text."
        );

        match self.generate_text(&prompt).await.as_deref().and_then(parse_quiz_response) {
            Some(questions) => questions,
            None => {
                log::warn!("Quiz generation for '{}' failed, serving fallback questions", word);
                fallback_quiz(word)
            }
        }
    }

    // Single attempt, no retries; reqwest's defaults are the only timeout.
    async fn generate_text(&self, prompt: &str) -> Option<String> {
        let url = format!(
            "{GEMINI_API_BASE}/models/{}:generateContent?key={}",
            self.model, self.api_key
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        let response = match self.client.post(&url).json(&request).send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Gemini request failed: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            log::warn!("Gemini returned HTTP {}", response.status());
            return None;
        }

        let body: GenerateContentResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                log::warn!("Gemini response was not valid JSON: {}", e);
                return None;
            }
        };

        body.candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .and_then(|content| content.parts.into_iter().next())
            .map(|part| part.text)
    }
}

/// Models often wrap JSON in markdown code fences despite instructions.
fn strip_code_fences(text: &str) -> String {
    if text.contains("```") {
        text.replace("```json", "").replace("```", "").trim().to_string()
    } else {
        text.trim().to_string()
    }
}

fn parse_word_response(text: &str) -> Option<WordData> {
    serde_json::from_str(&strip_code_fences(text)).ok()
}

fn parse_quiz_response(text: &str) -> Option<Vec<QuizQuestion>> {
    let questions: Vec<QuizQuestion> = serde_json::from_str(&strip_code_fences(text)).ok()?;
    let well_formed = questions
        .iter()
        .all(|q| q.options.len() == 4 && q.options.contains(&q.correct_answer));
    well_formed.then_some(questions)
}

fn fallback_word() -> WordData {
    WordData {
        word: "Serendipity".into(),
        meaning: "The occurrence of events by chance in a beneficial way".into(),
        synonyms: vec!["luck".into(), "fortune".into(), "chance".into()],
        antonyms: vec!["misfortune".into(), "bad luck".into()],
        example_sentence: "Her discovery of the rare book was pure serendipity.".into(),
        rephrased_meaning: "Finding something wonderful when you weren't specifically looking for it"
            .into(),
    }
}

fn fallback_quiz(word: &str) -> Vec<QuizQuestion> {
    let options: Vec<String> = ["Option A", "Option B", "Option C", "Option D"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    vec![
        QuizQuestion {
            question: format!("What is the meaning of '{word}'?"),
            options: options.clone(),
            correct_answer: "Option B".into(),
        },
        QuizQuestion {
            question: format!("Which sentence uses '{word}' correctly?"),
            options: options.clone(),
            correct_answer: "Option C".into(),
        },
        QuizQuestion {
            question: format!("Which word is closest in meaning to '{word}'?"),
            options,
            correct_answer: "Option A".into(),
        },
    ]
}
