use crate::utils::error::WorkflowError;
use std::fmt;
use std::str::FromStr;

/// Secretariat that submitted the workbook. `Unselected` is the empty choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Area {
    Unselected,
    AmbienteYEspacioPublico,
    Arsi,
    CapitalHumano,
    DesarrolloHumanoYDeportes,
    EducacionCulturaYTrabajo,
    General,
    Gobierno,
    Hcd,
    HaciendaYFinanzas,
    JefaturaDeGabinete,
    LegalYTecnica,
    PlaneamientoUrbano,
    Privada,
    SaludPublica,
    Seguridad,
}

impl Area {
    pub const ALL: [Area; 16] = [
        Area::Unselected,
        Area::AmbienteYEspacioPublico,
        Area::Arsi,
        Area::CapitalHumano,
        Area::DesarrolloHumanoYDeportes,
        Area::EducacionCulturaYTrabajo,
        Area::General,
        Area::Gobierno,
        Area::Hcd,
        Area::HaciendaYFinanzas,
        Area::JefaturaDeGabinete,
        Area::LegalYTecnica,
        Area::PlaneamientoUrbano,
        Area::Privada,
        Area::SaludPublica,
        Area::Seguridad,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Area::Unselected => "",
            Area::AmbienteYEspacioPublico => "AMBIENTE Y ESPACIO PUBLICO",
            Area::Arsi => "ARSI",
            Area::CapitalHumano => "CAPITAL HUMANO",
            Area::DesarrolloHumanoYDeportes => "DESARROLLO HUMANO Y DEPORTES",
            Area::EducacionCulturaYTrabajo => "EDUCACION, CULTURA Y TRABAJO",
            Area::General => "GENERAL",
            Area::Gobierno => "GOBIERNO",
            Area::Hcd => "H.C.D.",
            Area::HaciendaYFinanzas => "HACIENDA Y FINANZAS",
            Area::JefaturaDeGabinete => "JEFATURA DE GABINETE",
            Area::LegalYTecnica => "LEGAL Y TECNICA",
            Area::PlaneamientoUrbano => "PLANEAMIENTO URBANO",
            Area::Privada => "PRIVADA",
            Area::SaludPublica => "SALUD PUBLICA",
            Area::Seguridad => "SEGURIDAD",
        }
    }

    /// Areas whose workbooks are always split by office.
    pub fn requires_office_split(&self) -> bool {
        matches!(
            self,
            Area::AmbienteYEspacioPublico
                | Area::SaludPublica
                | Area::DesarrolloHumanoYDeportes
                | Area::EducacionCulturaYTrabajo
        )
    }

    pub fn is_selected(&self) -> bool {
        *self != Area::Unselected
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Area {
    type Err = WorkflowError;

    /// Case-insensitive match on the area name; blank input is `Unselected`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Area::ALL
            .iter()
            .copied()
            .find(|area| area.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| WorkflowError::UnknownArea {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn there_are_sixteen_choices_including_the_blank_one() {
        assert_eq!(Area::ALL.len(), 16);
        assert_eq!(Area::ALL.iter().filter(|a| !a.is_selected()).count(), 1);
    }

    #[test]
    fn exactly_four_areas_force_the_split() {
        let forced: Vec<_> = Area::ALL
            .iter()
            .filter(|a| a.requires_office_split())
            .map(|a| a.name())
            .collect();
        assert_eq!(
            forced,
            vec![
                "AMBIENTE Y ESPACIO PUBLICO",
                "DESARROLLO HUMANO Y DEPORTES",
                "EDUCACION, CULTURA Y TRABAJO",
                "SALUD PUBLICA",
            ]
        );
    }

    #[test]
    fn parses_names_case_insensitively() {
        assert_eq!("salud publica".parse::<Area>().unwrap(), Area::SaludPublica);
        assert_eq!(" H.C.D. ".parse::<Area>().unwrap(), Area::Hcd);
        assert_eq!("".parse::<Area>().unwrap(), Area::Unselected);
        assert!(matches!(
            "TURISMO".parse::<Area>(),
            Err(WorkflowError::UnknownArea { .. })
        ));
    }
}
