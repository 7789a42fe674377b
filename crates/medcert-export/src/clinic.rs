use serde::{Deserialize, Serialize};

/// Letterhead printed on every declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicProfile {
    pub name: String,
    pub tagline: String,
    /// Second header line listing the exams offered.
    pub services: String,
    pub legal_name: String,
    pub address: String,
    /// City printed before the signature date ("Brasília, 09/11/2025").
    pub city: String,
}

impl Default for ClinicProfile {
    fn default() -> Self {
        Self {
            name: "NOVA".to_string(),
            tagline: "Medicina e Segurança do Trabalho.".to_string(),
            services: "Exames: Admissionais, Demissionais, Periódicos e Outros.".to_string(),
            legal_name: "NOVA MEDICINA E SEGURANÇA DO TRABALHO LTDA.".to_string(),
            address: "SDS, Bloco D, Ed. Eldorado, Entrada B, 1.º Subsolo - Sala 01 \
                      CEP 70.392.901 Brasília-DF."
                .to_string(),
            city: "Brasília".to_string(),
        }
    }
}
