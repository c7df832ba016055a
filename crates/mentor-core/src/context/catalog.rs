//! Fixed prompt content for the informational pages: the universal laws and the courses.

pub const LAWS: &[&str] = &[
    "Etki-Tepki Yasası",
    "Dengelenme Yasası",
    "Hakediş Yasası",
    "Benzerlik Yasası",
    "Zıtlıklar Yasası",
    "Değişim Yasası",
];

/// Question asked when a law is opened.
pub fn law_prompt(law: &str) -> String {
    format!(
        "Deneysel Tasarım Öğretisi bağlamında \"{law}\" nedir? Bu yasa hayatımızı nasıl etkiler? \
İnsan ilişkilerinde ve başarıda nasıl çalışır? Somut bir örnek ver."
    )
}

/// Case-insensitive lookup that also accepts the name without the "Yasası" suffix.
pub fn find_law(query: &str) -> Option<&'static str> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    LAWS.iter().copied().find(|law| {
        let lower = law.to_lowercase();
        lower == needle || lower.trim_end_matches(" yasası") == needle
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub prompt_context: &'static str,
}

pub const COURSES: &[Course] = &[
    Course {
        id: "relations",
        title: "İlişkilerde Ustalık",
        description: "İnsan tasarımlarını tanıyarak çatışmasız, uyumlu ve derin bağlar kurma sanatı.",
        prompt_context: "Bana Deneysel Tasarım Öğretisi kapsamında \"İlişkilerde Ustalık\" kursunu anlat. \
Bu kursun amacı nedir? Katılımcıya ne kazandırır? İletişim dilleri ve arketipler konusuna kısaca \
değinerek özetle.",
    },
    Course {
        id: "success",
        title: "Başarı ve Hedef",
        description: "Potansiyelinizi gerçekleştirmek ve maddesel dünyada sonuç almak için gerekli stratejiler.",
        prompt_context: "DTÖ perspektifiyle \"Başarı\" kursunu detaylandır. Başarı yasaları nelerdir? \
Başarısızlık korkusu, atalet ve hedef belirleme konularında bu öğreti ne söyler?",
    },
    Course {
        id: "avoidance",
        title: "Sakınma ve Korunma",
        description: "Gereksiz enerji kayıplarından, yanlış kişilerden ve negatif döngülerden korunma yöntemleri.",
        prompt_context: "DTÖ'de \"Sakınma Sanatı\" veya \"Korunma\" nedir? İnsan negatif olaylardan, yanlış \
kişilerden veya kendi tasarımına uymayan durumlardan nasıl sakınır? Bu eğitimin temel felsefesini açıkla.",
    },
];

pub fn find_course(id: &str) -> Option<&'static Course> {
    COURSES.iter().find(|c| c.id.eq_ignore_ascii_case(id.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_law_variants() {
        assert_eq!(find_law("Hakediş Yasası"), Some("Hakediş Yasası"));
        assert_eq!(find_law("hakediş"), Some("Hakediş Yasası"));
        assert_eq!(find_law("  değişim yasası "), Some("Değişim Yasası"));
        assert_eq!(find_law(""), None);
        assert_eq!(find_law("yerçekimi"), None);
    }

    #[test]
    fn test_law_prompt_mentions_law() {
        let prompt = law_prompt("Benzerlik Yasası");
        assert!(prompt.contains("\"Benzerlik Yasası\""));
        assert!(prompt.contains("Somut bir örnek"));
    }

    #[test]
    fn test_find_course() {
        assert_eq!(find_course("success").unwrap().title, "Başarı ve Hedef");
        assert!(find_course("SUCCESS").is_some());
        assert!(find_course("cooking").is_none());
        assert_eq!(COURSES.len(), 3);
    }
}
