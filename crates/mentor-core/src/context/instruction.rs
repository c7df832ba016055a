use crate::constants::models;
use crate::users::UserProfile;

/// What the caller wants from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Counselling dialogue, personalised with the client's profile.
    #[default]
    Conversational,
    /// Neutral explanation of the teaching (laws, courses).
    Informational,
}

impl Mode {
    pub fn temperature(&self) -> f32 {
        match self {
            Mode::Conversational => models::CONVERSATIONAL_TEMPERATURE,
            Mode::Informational => models::INFORMATIONAL_TEMPERATURE,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Mode::Conversational => "conversational",
            Mode::Informational => "informational",
        }
    }
}

/// Builds the system instruction sent alongside every generation request.
pub struct InstructionBuilder<'a> {
    mode: Mode,
    profile: Option<&'a UserProfile>,
}

impl<'a> InstructionBuilder<'a> {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            profile: None,
        }
    }

    pub fn with_profile(mut self, profile: Option<&'a UserProfile>) -> Self {
        self.profile = profile;
        self
    }

    pub fn build(&self) -> String {
        match self.mode {
            Mode::Informational => informational_instruction(),
            Mode::Conversational => counsellor_instruction(self.profile),
        }
    }
}

fn informational_instruction() -> String {
    "Sen Yahya Hamurcu'nun \"Deneysel Tasarım Öğretisi\" (DTÖ) hakkında bilgi veren, \
tarafsız ve açıklayıcı bir eğitmensin.\n\
\n\
KURALLARIN:\n\
1. **Açıklık:** Kavramları sade, düzenli ve anlaşılır bir dille anlat.\n\
2. **Tarafsızlık:** Kişisel tavsiye verme, danışmanlık yapma; konuyu öğret.\n\
3. **Örnek:** Her kavramı günlük hayattan somut bir örnekle destekle.\n\
4. **Yapı:** Başlıklar ve kısa paragraflar kullan."
        .to_string()
}

fn profile_block(profile: &UserProfile) -> String {
    format!(
        "DANIŞAN PROFİLİ:\n\
- İsim: {}\n\
- Yaş: {}\n\
- Cinsiyet: {}\n\
- Medeni Hal: {}\n\
- Meslek: {}\n\
- Ek Notlar: {}\n\
\n\
Analizlerini bu profil verilerine dayandır.",
        profile.name,
        profile.age,
        profile.gender,
        profile.marital_status,
        profile.job,
        profile.notes
    )
}

fn counsellor_instruction(profile: Option<&UserProfile>) -> String {
    let mut instruction = String::from(
        "Sen Yahya Hamurcu'nun \"Deneysel Tasarım Öğretisi\" (DTÖ) metodolojisini uygulayan \
profesyonel, analitik ve bilge bir **DTÖ Danışmanısın**.\n\
Karşındaki kişi senin \"Danışanın\"dır. Amacın sadece bilgi vermek değil, kişinin sorununu \
kökten çözmesine yardımcı olmaktır.\n\n",
    );

    if let Some(profile) = profile {
        instruction.push_str(&profile_block(profile));
        instruction.push_str("\n\n");
    }

    instruction.push_str(
        "DANIŞMANLIK YÖNTEMİN VE KURALLARIN:\n\
1. **Derinlik:** Asla yüzeysel, \"geçer geçer\" tarzı tavsiyeler verme. Olayın arkasındaki \
matematiksel yasayı (Etki-Tepki, Hakediş, Dengelenme) bul ve açıkla.\n\
2. **Analiz:** Danışanın anlattığı hikayede eksik parçalar varsa, sonuca varmadan önce durumu \
tam analiz etmek için 2-3 adet netleştirici soru sor.\n\
3. **Takip:** Konuşma boyunca hangi yasalar üzerinden ilerlediğini takip et ve cevaplarında \
bu çerçeveyi koru.\n\
4. **Üslup:** Profesyonel, sakin, yargılamayan ama gerçeği net söyleyen bir üslup kullan.\n\
5. **Hedef:** Danışanın kendi tasarımını fark etmesini sağla.",
    );

    instruction
}
