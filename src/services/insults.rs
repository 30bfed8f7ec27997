//! Taunt generation for overdue books
//!
//! Two sources: a fixed pool picked at random, and Gemini. The Gemini
//! source never fails; any upstream problem yields `FALLBACK_INSULT`.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::types::{Book, Result, TsundokuError};

/// Sent when the model gives nothing usable
pub const FALLBACK_INSULT: &str = "期限を過ぎた本があります。そろそろ読みませんか？";

/// Produces the message pushed for an overdue book
#[async_trait]
pub trait InsultSource: Send + Sync {
    async fn generate(&self, book: &Book) -> Result<String>;
}

// =============================================================================
// Static pool
// =============================================================================

/// Picks uniformly from a fixed list of taunts
#[derive(Debug, Default, Clone)]
pub struct StaticInsults;

impl StaticInsults {
    pub fn new() -> Self {
        Self
    }

    /// Every taunt the pool can produce for `book`
    pub fn pool(book: &Book) -> Vec<String> {
        vec![
            "その本、いつ読むの？もうオブジェになってない？w".to_string(),
            "積読タワー建設中？完成披露パーティーはいつですか？（早く読め）".to_string(),
            "買った時の情熱、どこいった〜？🔥 本が泣いてるよ！".to_string(),
            format!("「{}」が本棚の飾りになってるって噂、本当だったんだね…", book.title),
            "読書、今日からじゃなくて今から始めよっか！".to_string(),
            "その本、インテリアにするにはちょっと高いんじゃない？笑".to_string(),
            "大丈夫、まだ間に合う！その本を手に取って最初の1ページを開くだけでいい！".to_string(),
        ]
    }
}

#[async_trait]
impl InsultSource for StaticInsults {
    async fn generate(&self, book: &Book) -> Result<String> {
        let pool = Self::pool(book);
        pool.choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(|| TsundokuError::Internal("empty insult pool".into()))
    }
}

// =============================================================================
// Gemini
// =============================================================================

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize, Default)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize, Default)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize, Default)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateResponse {
    fn first_text(&self) -> Option<&str> {
        let text = self
            .candidates
            .first()?
            .content
            .parts
            .first()?
            .text
            .trim();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Asks Gemini for a taunt tailored to the book
pub struct GeminiInsults {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiInsults {
    pub fn new(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("tsundoku/1.0")
            .build()
            .unwrap_or_default();

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }

    async fn request(&self, prompt: String) -> Result<Option<String>> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(TsundokuError::Upstream(format!(
                "Gemini returned {}: {}",
                status, text
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.first_text().map(str::to_string))
    }
}

/// Prompt sent to the model; harsher wording as the level rises
pub fn build_prompt(book: &Book) -> String {
    format!(
        "あなたは積読を許さない辛口の読書コーチです。\
         ユーザーは『{}』（著者: {}）を期限までに読みませんでした。\
         煽りレベル{}（1が優しめ、5が最も辛辣）で、LINEで送る短い煽りメッセージを日本語で1つだけ書いてください。\
         100文字以内で、メッセージ本文のみを返してください。",
        book.title, book.author, book.insult_level
    )
}

#[async_trait]
impl InsultSource for GeminiInsults {
    async fn generate(&self, book: &Book) -> Result<String> {
        match self.request(build_prompt(book)).await {
            Ok(Some(text)) => {
                debug!(book_id = %book.book_id, "Gemini produced message");
                Ok(text)
            }
            Ok(None) => {
                warn!(book_id = %book.book_id, "Gemini returned no text, using fallback message");
                Ok(FALLBACK_INSULT.to_string())
            }
            Err(e) => {
                warn!(book_id = %book.book_id, error = %e, "Gemini call failed, using fallback message");
                Ok(FALLBACK_INSULT.to_string())
            }
        }
    }
}
