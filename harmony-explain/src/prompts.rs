//! Prompt construction for explanations and translations
//!
//! Explanations are written in Arabic, addressed to the target participant,
//! then translated Arabic → English → Hebrew. Match names are transliterated
//! on their own.

use harmony_core::{CrossFieldScore, FieldKind};

use crate::capability::GenerationRequest;

/// Output ceiling for the primary explanation
pub const EXPLANATION_MAX_TOKENS: u32 = 250;
/// Output ceiling for each translation pass
pub const TRANSLATION_MAX_TOKENS: u32 = 400;
/// Output ceiling for a translated name
pub const NAME_TRANSLATION_MAX_TOKENS: u32 = 40;

const EXPLANATION_TEMPERATURE: f32 = 0.7;
const TRANSLATION_TEMPERATURE: f32 = 0.2;
const NAME_TEMPERATURE: f32 = 0.0;

/// Cross-field pairs compared as supplementary signal: the target's first
/// field against the match's second field
pub const CROSS_FIELD_PAIRS: [(FieldKind, FieldKind); 4] = [
    (FieldKind::Academic, FieldKind::Personal),
    (FieldKind::Academic, FieldKind::Professional),
    (FieldKind::Professional, FieldKind::Personal),
    (FieldKind::JobTitle, FieldKind::Professional),
];

const EXPLANATION_SYSTEM: &str = r#"أنت تكتب شرحًا موجّهًا مباشرة إلى المستخدم نفسه.

لغة الإخراج:
- العربية فقط.
- ممنوع تمامًا استخدام أي كلمة إنجليزية أو حروف لاتينية.
- إذا ظهرت أي كلمة غير عربية، فالنتيجة خاطئة.

طريقة الكتابة (إلزامية):
- خاطب المستخدم بصيغة المخاطَب فقط: "أنت"، "لك"، "معك".
- لا تذكر اسم المستخدم نهائيًا.
- يُسمح بذكر اسم الشخص الآخر فقط.
- اكتب وكأنك تشرح للمستخدم لماذا هذا الشخص مناسب له شخصيًا.

قواعد صارمة جدًا:
- اكتب 2–3 جمل فقط.
- كل جملة يجب أن تشرح نقطة واحدة مشتركة أو مكمّلة بينك وبين الشخص الآخر.
- ممنوع وصف كل شخص لوحده.
- ممنوع ذكر معلومات غير مشتركة.
- ممنوع استخدام صيغ مثل:
  "فلان وفلان"، "كلاكما"، "الطرفين"، "الشخصين".
- ممنوع استخدام لغة عامة أو إنشائية.

إذا لم تستطع الالتزام بجميع القواعد،
اكتب فقط: "لا يوجد تشابه واضح يمكن شرحه.""#;

const TRANSLATE_TO_ENGLISH_SYSTEM: &str = r#"You are a professional translator.
Your task is to translate Arabic text into clear, natural English.

Rules:
- Translation ONLY.
- Do NOT add, remove, or rephrase content.
- Do NOT explain.
- Keep the same meaning and tone.
- Keep names and organizations exactly as written.
- Return ONLY the translation."#;

const TRANSLATE_TO_HEBREW_SYSTEM: &str = r#"אתה מתרגם מקצועי.

המשימה שלך היא לתרגם את הטקסט הנתון מאנגלית לעברית באופן נאמן ומדויק.

כללים מחייבים:
- אין לשנות משמעות.
- אין להוסיף מידע.
- אין להסיר מידע.
- אין לנסח מחדש.
- אין לסכם.
- אין לשנות גוף, זמן או נקודת מבט.
- שמור על מבנה המשפטים והזרימה המקורית ככל האפשר.
- שמור במדויק על שמות פרטיים, שמות חברות, מוסדות ומונחים מקצועיים.
- אם מופיע טקסט באנגלית שאין לתרגם (כגון שמות), השאר אותו כפי שהוא.
- שים לב לזכר ונקבה וכתוב בניסוח נכון.

פלט:
- החזר תרגום בלבד.
- ללא הסברים, הערות או טקסט נוסף."#;

const NAME_TO_ENGLISH_SYSTEM: &str = r#"You transliterate/translate personal names into English.

Rules:
- Output ONLY the name (no extra words).
- Do not add titles or explanations.
- Keep the same order of name parts.
- If the name is already in Latin letters, return it as-is."#;

const NAME_TO_HEBREW_SYSTEM: &str = r#"אתה מתמחה בתעתיק/תרגום שמות לעברית.

כללים:
- החזר/י שם בלבד (ללא משפטים, ללא תוספות).
- אין להוסיף תארים/כינויים/מקצוע.
- שמור/י על סדר רכיבי השם כפי שמופיע במקור.
- אם השם כבר בעברית, החזר/י אותו כפי שהוא."#;

/// Inputs of the explanation prompt
#[derive(Debug, Clone)]
pub struct ExplanationPrompt<'a> {
    pub match_name: &'a str,
    pub best_field: FieldKind,
    pub target_text: &'a str,
    pub match_text: &'a str,
    /// Strongest complementary field pair, if any
    pub cross_field: Option<&'a CrossFieldScore>,
}

impl ExplanationPrompt<'_> {
    pub fn to_request(&self) -> GenerationRequest {
        let mut prompt = format!(
            "المشارك المقترح:\n{}\n\nالمجال المشترك:\n{}\n\nمعلوماتك:\n{}\n\nمعلومات المشارك المقترح:\n{}\n",
            self.match_name,
            self.best_field.label(),
            self.target_text.trim(),
            self.match_text.trim(),
        );

        if let Some(cross) = self.cross_field {
            prompt.push_str(&format!(
                "\nمجال مكمّل:\n{} ↔ {}\n",
                cross.from.label(),
                cross.to.label()
            ));
        }

        prompt.push_str("\nاكتب الشرح وفق التعليمات أعلاه.");

        GenerationRequest::new(EXPLANATION_SYSTEM, prompt, EXPLANATION_MAX_TOKENS)
            .with_temperature(EXPLANATION_TEMPERATURE)
    }
}

pub fn translate_to_english(arabic: &str) -> GenerationRequest {
    GenerationRequest::new(TRANSLATE_TO_ENGLISH_SYSTEM, arabic, TRANSLATION_MAX_TOKENS)
        .with_temperature(TRANSLATION_TEMPERATURE)
}

pub fn translate_to_hebrew(english: &str) -> GenerationRequest {
    GenerationRequest::new(TRANSLATE_TO_HEBREW_SYSTEM, english, TRANSLATION_MAX_TOKENS)
        .with_temperature(TRANSLATION_TEMPERATURE)
}

pub fn name_to_english(name: &str) -> GenerationRequest {
    GenerationRequest::new(NAME_TO_ENGLISH_SYSTEM, name, NAME_TRANSLATION_MAX_TOKENS)
        .with_temperature(NAME_TEMPERATURE)
}

pub fn name_to_hebrew(name: &str) -> GenerationRequest {
    GenerationRequest::new(NAME_TO_HEBREW_SYSTEM, name, NAME_TRANSLATION_MAX_TOKENS)
        .with_temperature(NAME_TEMPERATURE)
}

/// Flatten model output to a single line; empty output becomes `None`
pub fn collapse_whitespace(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
