//! Stage definitions
//!
//! Each stage is an [`AgentSpec`] plus a message builder. Prompts instruct
//! the model to answer in a fixed JSON shape; the required-field lists here
//! mirror the top level of those shapes. Fallback payloads carry the same
//! shape with degraded values so downstream consumers never see a missing
//! stage.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::task::AgentSpec;
use crate::ai::types::{ChatMessage, IntentAnalysis, UserContext};

/// A course available for recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseSummary {
    pub title: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

const INTENT_PROMPT: &str = r#"你是一个专业的意图分析助手，专门负责分析用户是否在咨询企业培训课程相关的内容。请分析用户的输入，并返回以下格式的 JSON 响应：
{
    "intent": "用户的主要意图（例如：咨询周报写作、会议记录技巧、职场沟通、时间管理等企业培训课程相关主题）",
    "confidence": 0.0-1.0 之间的置信度分数,
    "entities": {
        "topic": "具体培训主题",
        "level": "培训难度级别（如：入门、进阶、高级）",
        "format": "期望的培训形式（如：线上课程、线下培训、工作坊）"
    }
}

请确保：
1. intent 应该明确表示是否是咨询企业培训课程相关的内容
2. confidence 应该是 0-1 之间的浮点数，表示判断的置信度
3. entities 应该包含从用户输入中提取的关键信息，如具体培训主题、难度级别等
4. 返回的必须是合法的 JSON 格式
5. 对于非企业培训课程相关的咨询，intent 应设置为 "非培训课程咨询" 并给出较低的置信度"#;

fn intent_fallback(message: &str) -> Value {
    json!({
        "intent": "解析错误",
        "confidence": 0.0,
        "entities": {"error": message}
    })
}

pub const INTENT_ANALYSIS: AgentSpec = AgentSpec {
    name: "intent_analysis",
    system_prompt: INTENT_PROMPT,
    required_fields: &["intent", "confidence", "entities"],
    progress_steps: &[
        "正在分析用户输入...",
        "提取关键信息...",
        "识别用户意图...",
        "计算置信度...",
        "整理分析结果...",
    ],
    temperature: 0.3,
    fallback: intent_fallback,
};

/// Intent analysis sees the whole conversation after the system prompt.
pub fn intent_messages(context: &UserContext) -> Vec<ChatMessage> {
    let mut messages = vec![ChatMessage::system(INTENT_ANALYSIS.system_prompt)];
    messages.extend(context.messages.iter().cloned());
    messages
}

const RESPONSE_PROMPT: &str = r#"你是一个专业的企业培训和工作顾问，负责根据用户的问题提供专业、准确、实用的回答。请生成回答，并返回以下格式的 JSON 响应：
{
    "response": {
        "main_answer": "主要回答内容",
        "key_points": ["关键点1", "关键点2"],
        "practical_examples": ["实际案例1", "实际案例2"],
        "implementation_steps": ["实施步骤1", "实施步骤2"],
        "common_pitfalls": ["常见问题1", "常见问题2"],
        "best_practices": ["最佳实践1", "最佳实践2"],
        "additional_resources": ["相关资源1", "相关资源2"]
    },
    "metadata": {
        "confidence": 0.0-1.0 之间的置信度分数,
        "complexity": "回答的复杂度（如：简单、中等、复杂）",
        "estimated_time": "预计阅读时间（分钟）",
        "target_audience": "目标受众（如：新员工、管理者、普通员工）",
        "prerequisites": ["前置知识1", "前置知识2"]
    }
}

请确保：
1. 回答应该专业、准确、实用
2. 关键点应该清晰、具体
3. 实际案例应该真实、可操作
4. 实施步骤应该详细、可执行
5. 常见问题应该具有代表性
6. 最佳实践应该符合企业场景
7. 相关资源应该有助于深入学习
8. 返回的必须是合法的 JSON 格式"#;

fn response_fallback(message: &str) -> Value {
    json!({
        "error": message,
        "response": {
            "main_answer": "无法生成回答",
            "key_points": ["无法生成"],
            "practical_examples": ["无法生成"],
            "implementation_steps": ["无法生成"],
            "common_pitfalls": ["无法生成"],
            "best_practices": ["无法生成"],
            "additional_resources": ["无法生成"]
        },
        "metadata": {
            "confidence": 0.0,
            "complexity": "未知",
            "estimated_time": 0,
            "target_audience": "未知",
            "prerequisites": ["无法生成"]
        }
    })
}

pub const AI_RESPONSE: AgentSpec = AgentSpec {
    name: "ai_response",
    system_prompt: RESPONSE_PROMPT,
    required_fields: &["response", "metadata"],
    progress_steps: &[
        "正在分析问题...",
        "生成主要回答...",
        "整理关键信息...",
        "准备实际案例...",
        "完善实施步骤...",
        "总结最佳实践...",
    ],
    temperature: 0.7,
    fallback: response_fallback,
};

pub fn response_messages(context: &UserContext, intent: &IntentAnalysis) -> Vec<ChatMessage> {
    let question = context.last_user_message();
    let user = format!(
        "请根据以下信息生成专业的回答：\n\n用户意图：{}\n置信度：{}\n实体信息：{}\n\n用户问题：{}",
        intent.intent,
        intent.confidence,
        serde_json::to_string(&intent.entities).unwrap_or_default(),
        question,
    );
    vec![
        ChatMessage::system(AI_RESPONSE.system_prompt),
        ChatMessage::user(user),
    ]
}

const CRITIQUE_PROMPT: &str = r#"你是一个专业的企业培训和工作顾问，专门负责分析用户的提问方式并提供改进建议。请分析用户的提问，并返回以下格式的 JSON 响应：
{
    "question_analysis": {
        "clarity": "提问的清晰度评分（0-1）",
        "specificity": "提问的具体性评分（0-1）",
        "context": "提问的上下文完整性评分（0-1）",
        "professionalism": "提问的专业性评分（0-1）",
        "overall_score": "总体评分（0-1）",
        "is_work_method_related": "是否是工作方法相关提问（true/false）"
    },
    "improvement_suggestions": {
        "clarity_improvements": ["清晰度改进建议1", "清晰度改进建议2"],
        "specificity_improvements": ["具体性改进建议1", "具体性改进建议2"],
        "context_improvements": ["上下文改进建议1", "上下文改进建议2"],
        "professionalism_improvements": ["专业性改进建议1", "专业性改进建议2"],
        "work_method_specific": ["工作方法相关的改进建议1", "工作方法相关的改进建议2"]
    },
    "best_practices": {
        "question_structure": "建议的提问结构",
        "key_elements": ["关键要素1", "关键要素2"],
        "examples": ["好的提问示例1", "好的提问示例2"],
        "work_method_focus": ["工作方法相关的关键要素1", "工作方法相关的关键要素2"]
    },
    "follow_up_questions": ["跟进问题1", "跟进问题2"],
    "work_method_insights": {
        "current_approach": "当前工作方法的分析",
        "potential_improvements": ["可能的改进方向1", "可能的改进方向2"],
        "success_metrics": ["成功指标1", "成功指标2"]
    }
}

请确保：
1. 评分应该客观反映用户提问的实际水平
2. 改进建议应该具体、可操作
3. 最佳实践应该符合企业培训和工作场景
4. 跟进问题应该有助于深入理解主题
5. 返回的必须是合法的 JSON 格式
6. 对于工作方法相关的提问，提供更详细的分析和建议
7. 工作方法洞察部分应该包含对当前工作方法的分析和改进建议"#;

fn critique_fallback(message: &str) -> Value {
    json!({
        "error": message,
        "question_analysis": {
            "clarity": 0.0,
            "specificity": 0.0,
            "context": 0.0,
            "professionalism": 0.0,
            "overall_score": 0.0,
            "is_work_method_related": false
        },
        "improvement_suggestions": {
            "clarity_improvements": ["无法分析"],
            "specificity_improvements": ["无法分析"],
            "context_improvements": ["无法分析"],
            "professionalism_improvements": ["无法分析"],
            "work_method_specific": ["无法分析"]
        },
        "best_practices": {
            "question_structure": "无法分析",
            "key_elements": ["无法分析"],
            "examples": ["无法分析"],
            "work_method_focus": ["无法分析"]
        },
        "follow_up_questions": ["无法分析"],
        "work_method_insights": {
            "current_approach": "无法分析",
            "potential_improvements": ["无法分析"],
            "success_metrics": ["无法分析"]
        }
    })
}

pub const QUESTION_CRITIQUE: AgentSpec = AgentSpec {
    name: "question_analysis",
    system_prompt: CRITIQUE_PROMPT,
    required_fields: &[
        "question_analysis",
        "improvement_suggestions",
        "best_practices",
        "follow_up_questions",
        "work_method_insights",
    ],
    progress_steps: &[
        "正在分析提问方式...",
        "评估提问质量...",
        "生成改进建议...",
        "整理最佳实践...",
        "准备跟进问题...",
    ],
    temperature: 0.3,
    fallback: critique_fallback,
};

pub fn critique_messages(context: &UserContext, intent: &IntentAnalysis) -> Vec<ChatMessage> {
    let question = context.last_user_message();
    let user = format!(
        "请分析以下用户提问，并提供改进建议：\n\n用户意图：{}\n置信度：{}\n实体信息：{}\n\n用户提问：{}",
        intent.intent,
        intent.confidence,
        serde_json::to_string(&intent.entities).unwrap_or_default(),
        question,
    );
    vec![
        ChatMessage::system(QUESTION_CRITIQUE.system_prompt),
        ChatMessage::user(user),
    ]
}

const STRATEGY_PROMPT: &str = r#"你是一个专业的催收策略分析助手。请根据用户的意图分析结果，生成合适的催收策略。
请返回以下格式的 JSON 响应：
{
    "strategy": "催收策略（例如：电话催收、上门催收、法律催收等）",
    "priority": "优先级（high/medium/low）",
    "timeline": "执行时间线",
    "approach": "具体执行方法",
    "risk_level": "风险等级（high/medium/low）",
    "notes": "注意事项"
}

请确保：
1. 策略要符合用户意图和风险等级
2. 优先级和风险等级使用英文
3. 时间线要具体明确
4. 执行方法要详细可行
5. 注意事项要全面
6. 返回的必须是合法的 JSON 格式
7. 不要添加任何额外的注释或说明，只返回JSON"#;

fn strategy_fallback(message: &str) -> Value {
    json!({
        "strategy": "分析错误",
        "priority": "medium",
        "timeline": "待定",
        "approach": message,
        "risk_level": "medium",
        "notes": "请检查系统日志"
    })
}

pub const COLLECTION_STRATEGY: AgentSpec = AgentSpec {
    name: "collection_strategy",
    system_prompt: STRATEGY_PROMPT,
    required_fields: &[
        "strategy",
        "priority",
        "timeline",
        "approach",
        "risk_level",
        "notes",
    ],
    progress_steps: &[
        "开始分析催收策略...",
        "正在分析用户意图...",
        "评估风险等级...",
        "制定催收策略...",
        "确定执行优先级...",
        "生成执行建议...",
    ],
    temperature: 0.3,
    fallback: strategy_fallback,
};

/// Strategy analysis is driven from the intent result alone.
pub fn strategy_messages(intent: &IntentAnalysis) -> Vec<ChatMessage> {
    let user = format!(
        "请根据以下意图分析结果生成催收策略：\n\n意图：{}\n置信度：{}\n实体信息：{}",
        intent.intent,
        intent.confidence,
        serde_json::to_string(&intent.entities).unwrap_or_default(),
    );
    vec![
        ChatMessage::system(COLLECTION_STRATEGY.system_prompt),
        ChatMessage::user(user),
    ]
}

const RECOMMENDATION_PROMPT: &str = r#"你是一个专业的课程推荐助手。基于用户的问题和意图分析，从给定的课程列表中推荐最相关的课程。
请分析用户输入和意图，并返回以下格式的 JSON 响应：
{
    "recommendations": [
        {
            "title": "课程标题",
            "relevance_score": 0.0-1.0 之间的相关度分数,
            "summary": "课程内容摘要",
            "source": "课程来源",
            "page": 1
        }
    ],
    "metadata": {
        "total_courses": 推荐课程数量,
        "query_context": {
            "intent": "用户意图",
            "confidence": 0.0-1.0 置信度
        }
    }
}

请确保：
1. 推荐的课程与用户的问题和意图高度相关
2. relevance_score 应该反映课程与用户需求的匹配度
3. 返回的必须是合法的 JSON 格式
4. 如果没有找到相关课程，返回空的推荐列表"#;

fn recommendation_fallback(message: &str) -> Value {
    json!({
        "error": message,
        "recommendations": [],
        "metadata": {
            "total_courses": 0,
            "query_context": {
                "intent": "未知",
                "confidence": 0.0
            }
        }
    })
}

pub const COURSE_RECOMMENDATION: AgentSpec = AgentSpec {
    name: "course_recommendation",
    system_prompt: RECOMMENDATION_PROMPT,
    required_fields: &["recommendations", "metadata"],
    progress_steps: &[],
    temperature: 0.3,
    fallback: recommendation_fallback,
};

pub fn recommendation_messages(
    context: &UserContext,
    intent: &IntentAnalysis,
    catalog: &[CourseSummary],
) -> Vec<ChatMessage> {
    let question = context
        .messages
        .iter()
        .find(|m| m.role == crate::ai::types::Role::User)
        .map(|m| m.content.clone())
        .unwrap_or_default();
    let user = format!(
        "用户问题: {}\n意图分析: {}\n可用课程: {}",
        question,
        serde_json::to_string(intent).unwrap_or_default(),
        serde_json::to_string(catalog).unwrap_or_default(),
    );
    vec![
        ChatMessage::system(COURSE_RECOMMENDATION.system_prompt),
        ChatMessage::user(user),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> UserContext {
        UserContext::from_messages(vec![
            ChatMessage::user("如何做好团队沟通？"),
            ChatMessage::assistant("好的"),
            ChatMessage::user("请给出具体步骤"),
        ])
    }

    fn intent() -> IntentAnalysis {
        IntentAnalysis {
            intent: "职场沟通".to_string(),
            confidence: 0.9,
            entities: Default::default(),
        }
    }

    #[test]
    fn test_intent_messages_include_full_conversation() {
        let messages = intent_messages(&context());
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].role, crate::ai::types::Role::System);
        assert_eq!(messages[3].content, "请给出具体步骤");
    }

    #[test]
    fn test_response_messages_quote_last_user_message() {
        let messages = response_messages(&context(), &intent());
        assert_eq!(messages.len(), 2);
        assert!(messages[1].content.contains("用户问题：请给出具体步骤"));
        assert!(messages[1].content.contains("用户意图：职场沟通"));
    }

    #[test]
    fn test_recommendation_messages_quote_first_user_message() {
        let catalog = vec![CourseSummary {
            title: "高效沟通".to_string(),
            summary: "这是高效沟通课程的内容摘要".to_string(),
            source: None,
        }];
        let messages = recommendation_messages(&context(), &intent(), &catalog);
        assert!(messages[1].content.contains("用户问题: 如何做好团队沟通？"));
        assert!(messages[1].content.contains("高效沟通"));
    }

    #[test]
    fn test_all_stage_fallbacks_carry_required_fields() {
        for spec in [
            INTENT_ANALYSIS,
            AI_RESPONSE,
            QUESTION_CRITIQUE,
            COLLECTION_STRATEGY,
            COURSE_RECOMMENDATION,
        ] {
            let payload = spec.fallback_payload("boom");
            for field in spec.required_fields {
                assert!(
                    payload.get(*field).is_some(),
                    "{} fallback missing {}",
                    spec.name,
                    field
                );
            }
        }
    }
}
