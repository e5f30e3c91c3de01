//! Grounded answer generation: retrieval, context assembly and the chat call.

use std::sync::Arc;

use serde::Serialize;

use super::embedder::{ChatMessage, ChatModel};
use super::error::Result;
use super::models::{ChunkMetadata, RetrievalResult};
use super::retriever::Retriever;

/// Placeholder context used when retrieval finds nothing.
pub const EMPTY_CONTEXT: &str = "（未检索到特别相关的课程材料）";

pub const DEFAULT_SYSTEM_PROMPT: &str = "\
你是一名认真负责的大学课程助教，课程主题是自然语言处理、统计语言模型、预训练语言模型与大语言模型。

回答要求：
1. 始终使用简体中文，以助教身份回答，语气友好、有耐心。
2. 优先依据提供的课程材料片段回答；材料有明确结论时先解释材料，再补充举例。
3. 材料中没有涉及时，明确说明“材料中没有直接说明”，再给出标注为“额外背景知识”的一般性解释。
4. 不要编造书名、论文、作者或页码；不确定时直接说明，并建议回看课件或询问老师。
5. 先给直观解释，再给较正式的技术表述；避免一次给出大段公式推导。
6. 作业或考试相关问题只讲解概念与思路，不直接给出完整答案。

尽量结构清晰、分点说明；能从材料看出文件名和页码时注明来源；结尾可给出简短的复习建议。";

/// A generated reply together with the chunks it was grounded on.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub sources: Vec<RetrievalResult>,
}

pub struct CourseAssistant {
    retriever: Arc<Retriever>,
    chat: Arc<dyn ChatModel>,
    system_prompt: String,
}

impl CourseAssistant {
    pub fn new(retriever: Arc<Retriever>, chat: Arc<dyn ChatModel>) -> Self {
        Self {
            retriever,
            chat,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Retrieve chunks for `query` and render them as numbered context blocks.
    pub async fn retrieve_context(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<(String, Vec<RetrievalResult>)> {
        let results = self.retriever.search(query, top_k).await?;
        Ok((format_context(&results), results))
    }

    /// Assemble the system prompt, prior turns and the grounded question.
    pub fn build_messages(
        &self,
        query: &str,
        context: &str,
        history: &[ChatMessage],
    ) -> Vec<ChatMessage> {
        let context = if context.trim().is_empty() {
            EMPTY_CONTEXT
        } else {
            context
        };

        let user_text = format!(
            "下面是与学生问题相关的课程材料片段（可能来自不同的课件/页码）：\n\n\
             {context}\n\n\
             请根据上述课程材料片段回答下面的问题。如果材料中没有直接涉及，也请明确说明。\n\n\
             学生问题：{query}\n\n\
             回答时请：\n\
             1. 优先引用和解释上面的课程材料内容；\n\
             2. 在合适的位置提到相关片段的来源（文件名、页码等）；\n\
             3. 用适合本科生的方式讲解，可以适当类比或举简单例子；\n\
             4. 如果需要补充课外背景知识，请标注为“【额外背景】”。"
        );

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt.clone()));
        messages.extend(history.iter().cloned());
        messages.push(ChatMessage::user(user_text));
        messages
    }

    /// Answer `query`, grounded on the top `top_k` chunks.
    ///
    /// Retrieval and completion failures are returned, never folded into the
    /// reply text.
    pub async fn answer(
        &self,
        query: &str,
        history: &[ChatMessage],
        top_k: Option<usize>,
    ) -> Result<Answer> {
        let top_k = top_k.unwrap_or_else(|| self.retriever.default_top_k());
        let (context, sources) = self.retrieve_context(query, top_k).await?;
        let messages = self.build_messages(query, &context, history);
        let text = self.chat.complete(&messages).await?;
        Ok(Answer { text, sources })
    }
}

/// Render results as `【检索结果 i】` blocks with their source line.
pub fn format_context(results: &[RetrievalResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "【检索结果 {}】\n来源：{}\n内容：\n{}\n",
                i + 1,
                source_tag(&item.metadata),
                item.content
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
        .trim()
        .to_string()
}

/// Human-readable provenance, e.g. `lecture3.pdf - 第 5 页/页码 (.pdf)`.
pub fn source_tag(metadata: &ChunkMetadata) -> String {
    let mut tag = metadata.filename.clone();
    if metadata.page_number > 0 {
        tag.push_str(&format!(" - 第 {} 页/页码", metadata.page_number));
    }
    tag.push_str(&format!(" ({})", metadata.filetype));
    tag
}
