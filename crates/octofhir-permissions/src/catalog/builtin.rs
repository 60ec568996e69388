//! Built-in permission catalog.
//!
//! The shape of the catalog (codes, resource bindings, access levels and
//! dependency edges) is language independent. Display strings are looked up
//! per language and fall back to English.

use super::AccessLevel::{Admin, Delete, Read, Write};
use super::source::CatalogSource;
use super::{AccessLevel, Permission, PermissionCategory};
use crate::PermissionResult;

/// Languages with translated display strings.
pub const SUPPORTED_LANGUAGES: &[&str] = &["en", "es"];

/// Language used when a requested language has no translation.
pub const FALLBACK_LANGUAGE: &str = "en";

struct CategoryDef {
    code: &'static str,
    display_order: u32,
}

struct PermissionDef {
    code: &'static str,
    category: &'static str,
    resource_type: Option<&'static str>,
    access_level: AccessLevel,
    dependencies: &'static [&'static str],
}

const fn def(
    code: &'static str,
    category: &'static str,
    resource_type: Option<&'static str>,
    access_level: AccessLevel,
    dependencies: &'static [&'static str],
) -> PermissionDef {
    PermissionDef {
        code,
        category,
        resource_type,
        access_level,
        dependencies,
    }
}

#[rustfmt::skip]
const CATEGORIES: &[CategoryDef] = &[
    CategoryDef { code: "patient-management", display_order: 1 },
    CategoryDef { code: "clinical-records", display_order: 2 },
    CategoryDef { code: "orders-results", display_order: 3 },
    CategoryDef { code: "scheduling", display_order: 4 },
    CategoryDef { code: "billing", display_order: 5 },
    CategoryDef { code: "administration", display_order: 6 },
];

#[rustfmt::skip]
const PERMISSIONS: &[PermissionDef] = &[
    // Patient management
    def("view-patient-list", "patient-management", Some("Patient"), Read, &[]),
    def("view-patient-demographics", "patient-management", Some("Patient"), Read, &["view-patient-list"]),
    def("edit-patient-demographics", "patient-management", Some("Patient"), Write, &["view-patient-demographics"]),
    def("create-patient", "patient-management", Some("Patient"), Write, &["view-patient-list"]),
    // Deleting a patient no longer requires edit access.
    def("delete-patient", "patient-management", Some("Patient"), Delete, &["view-patient-demographics"]),
    def("view-allergies", "patient-management", Some("AllergyIntolerance"), Read, &["view-patient-demographics"]),
    def("edit-allergies", "patient-management", Some("AllergyIntolerance"), Write, &["view-allergies"]),
    def("view-immunizations", "patient-management", Some("Immunization"), Read, &["view-patient-demographics"]),
    def("edit-immunizations", "patient-management", Some("Immunization"), Write, &["view-immunizations"]),
    // Clinical records
    def("view-encounters", "clinical-records", Some("Encounter"), Read, &[]),
    def("edit-encounters", "clinical-records", Some("Encounter"), Write, &["view-encounters", "view-patient-demographics"]),
    def("view-observations", "clinical-records", Some("Observation"), Read, &[]),
    def("edit-observations", "clinical-records", Some("Observation"), Write, &["view-observations"]),
    def("view-conditions", "clinical-records", Some("Condition"), Read, &[]),
    def("edit-conditions", "clinical-records", Some("Condition"), Write, &["view-conditions"]),
    def("view-procedures", "clinical-records", Some("Procedure"), Read, &[]),
    def("edit-procedures", "clinical-records", Some("Procedure"), Write, &["view-procedures", "view-encounters"]),
    def("view-clinical-documents", "clinical-records", Some("DocumentReference"), Read, &[]),
    def("edit-clinical-documents", "clinical-records", Some("DocumentReference"), Write, &["view-clinical-documents"]),
    def("delete-clinical-documents", "clinical-records", Some("DocumentReference"), Delete, &["view-clinical-documents"]),
    // Orders and results
    def("view-medications", "orders-results", Some("MedicationRequest"), Read, &[]),
    def("prescribe-medications", "orders-results", Some("MedicationRequest"), Write, &["view-medications", "view-patient-demographics"]),
    def("view-service-requests", "orders-results", Some("ServiceRequest"), Read, &[]),
    def("create-service-requests", "orders-results", Some("ServiceRequest"), Write, &["view-service-requests", "view-patient-demographics"]),
    def("view-diagnostic-reports", "orders-results", Some("DiagnosticReport"), Read, &[]),
    def("edit-diagnostic-reports", "orders-results", Some("DiagnosticReport"), Write, &["view-diagnostic-reports", "view-observations"]),
    // Scheduling
    def("view-appointments", "scheduling", Some("Appointment"), Read, &[]),
    def("manage-appointments", "scheduling", Some("Appointment"), Write, &["view-appointments", "view-patient-list"]),
    def("cancel-appointments", "scheduling", Some("Appointment"), Delete, &["view-appointments"]),
    def("view-schedules", "scheduling", Some("Schedule"), Read, &[]),
    def("manage-schedules", "scheduling", Some("Schedule"), Write, &["view-schedules", "view-staff"]),
    // Billing
    def("view-invoices", "billing", Some("Invoice"), Read, &[]),
    def("manage-invoices", "billing", Some("Invoice"), Write, &["view-invoices", "view-patient-list"]),
    def("view-claims", "billing", Some("Claim"), Read, &[]),
    def("submit-claims", "billing", Some("Claim"), Write, &["view-claims", "view-invoices", "view-coverage"]),
    def("view-coverage", "billing", Some("Coverage"), Read, &[]),
    def("edit-coverage", "billing", Some("Coverage"), Write, &["view-coverage"]),
    // Administration
    def("view-staff", "administration", Some("Practitioner"), Read, &[]),
    def("manage-staff", "administration", Some("Practitioner"), Write, &["view-staff"]),
    def("view-staff-roles", "administration", Some("PractitionerRole"), Read, &["view-staff"]),
    def("manage-staff-roles", "administration", Some("PractitionerRole"), Write, &["view-staff-roles"]),
    def("view-departments", "administration", Some("Organization"), Read, &[]),
    def("manage-departments", "administration", Some("Organization"), Admin, &["view-departments"]),
    def("view-roles", "administration", Some("AccessPolicy"), Read, &[]),
    def("manage-roles", "administration", Some("AccessPolicy"), Admin, &["view-roles", "view-staff"]),
    def("view-audit-log", "administration", Some("AuditEvent"), Read, &[]),
    def("export-data", "administration", None, Read, &["view-audit-log"]),
];

// (code, name, description)
type Text = (&'static str, &'static str, &'static str);

#[rustfmt::skip]
const EN: &[Text] = &[
    ("patient-management", "Patient Management", "Access to patient records and patient-level data"),
    ("clinical-records", "Clinical Records", "Encounters, observations, conditions and clinical documents"),
    ("orders-results", "Orders & Results", "Medication orders, service requests and diagnostic reports"),
    ("scheduling", "Scheduling", "Appointments and practitioner schedules"),
    ("billing", "Billing", "Invoices, claims and insurance coverage"),
    ("administration", "Administration", "Staff, departments, roles and audit data"),
    ("view-patient-list", "View patient list", "Browse and search the patient list"),
    ("view-patient-demographics", "View patient demographics", "Open a patient's demographic details"),
    ("edit-patient-demographics", "Edit patient demographics", "Change a patient's demographic details"),
    ("create-patient", "Register patients", "Register new patients"),
    ("delete-patient", "Delete patients", "Remove patient records"),
    ("view-allergies", "View allergies", "See recorded allergies and intolerances"),
    ("edit-allergies", "Edit allergies", "Record and update allergies and intolerances"),
    ("view-immunizations", "View immunizations", "See the immunization history"),
    ("edit-immunizations", "Edit immunizations", "Record administered immunizations"),
    ("view-encounters", "View encounters", "See visits and admissions"),
    ("edit-encounters", "Edit encounters", "Open, update and close encounters"),
    ("view-observations", "View observations", "See vital signs and lab values"),
    ("edit-observations", "Edit observations", "Record vital signs and lab values"),
    ("view-conditions", "View conditions", "See diagnoses and problem lists"),
    ("edit-conditions", "Edit conditions", "Record diagnoses and maintain problem lists"),
    ("view-procedures", "View procedures", "See performed procedures"),
    ("edit-procedures", "Edit procedures", "Record performed procedures"),
    ("view-clinical-documents", "View clinical documents", "Open clinical notes and attachments"),
    ("edit-clinical-documents", "Edit clinical documents", "Write clinical notes and upload attachments"),
    ("delete-clinical-documents", "Delete clinical documents", "Remove clinical notes and attachments"),
    ("view-medications", "View medications", "See medication orders"),
    ("prescribe-medications", "Prescribe medications", "Create and change medication orders"),
    ("view-service-requests", "View service requests", "See lab and imaging orders"),
    ("create-service-requests", "Order services", "Place lab and imaging orders"),
    ("view-diagnostic-reports", "View diagnostic reports", "See lab and imaging results"),
    ("edit-diagnostic-reports", "Edit diagnostic reports", "Enter and sign lab and imaging results"),
    ("view-appointments", "View appointments", "See booked appointments"),
    ("manage-appointments", "Manage appointments", "Book and reschedule appointments"),
    ("cancel-appointments", "Cancel appointments", "Cancel booked appointments"),
    ("view-schedules", "View schedules", "See practitioner schedules"),
    ("manage-schedules", "Manage schedules", "Maintain practitioner schedules"),
    ("view-invoices", "View invoices", "See patient invoices"),
    ("manage-invoices", "Manage invoices", "Issue and adjust invoices"),
    ("view-claims", "View claims", "See insurance claims"),
    ("submit-claims", "Submit claims", "Prepare and submit insurance claims"),
    ("view-coverage", "View coverage", "See insurance coverage"),
    ("edit-coverage", "Edit coverage", "Record and update insurance coverage"),
    ("view-staff", "View staff", "See practitioner accounts"),
    ("manage-staff", "Manage staff", "Create and update practitioner accounts"),
    ("view-staff-roles", "View staff assignments", "See practitioner role assignments"),
    ("manage-staff-roles", "Manage staff assignments", "Assign practitioners to departments and roles"),
    ("view-departments", "View departments", "See the department structure"),
    ("manage-departments", "Manage departments", "Create, change and remove departments"),
    ("view-roles", "View roles", "See roles and their permissions"),
    ("manage-roles", "Manage roles", "Create, change and remove roles"),
    ("view-audit-log", "View audit log", "See the audit trail"),
    ("export-data", "Export data", "Export tables to CSV or Excel"),
];

#[rustfmt::skip]
const ES: &[Text] = &[
    ("patient-management", "Gestión de pacientes", "Acceso a los expedientes y datos de pacientes"),
    ("clinical-records", "Registros clínicos", "Consultas, observaciones, diagnósticos y documentos clínicos"),
    ("orders-results", "Órdenes y resultados", "Recetas, solicitudes de servicio e informes diagnósticos"),
    ("scheduling", "Agenda", "Citas y agendas de profesionales"),
    ("billing", "Facturación", "Facturas, reclamaciones y coberturas de seguro"),
    ("administration", "Administración", "Personal, departamentos, roles y auditoría"),
    ("view-patient-list", "Ver lista de pacientes", "Consultar y buscar en la lista de pacientes"),
    ("view-patient-demographics", "Ver datos demográficos", "Abrir los datos demográficos de un paciente"),
    ("edit-patient-demographics", "Editar datos demográficos", "Modificar los datos demográficos de un paciente"),
    ("create-patient", "Registrar pacientes", "Dar de alta nuevos pacientes"),
    ("delete-patient", "Eliminar pacientes", "Eliminar expedientes de pacientes"),
    ("view-allergies", "Ver alergias", "Consultar alergias e intolerancias registradas"),
    ("edit-allergies", "Editar alergias", "Registrar y actualizar alergias e intolerancias"),
    ("view-immunizations", "Ver vacunas", "Consultar el historial de vacunación"),
    ("edit-immunizations", "Editar vacunas", "Registrar vacunas administradas"),
    ("view-encounters", "Ver consultas", "Consultar visitas e ingresos"),
    ("edit-encounters", "Editar consultas", "Abrir, actualizar y cerrar consultas"),
    ("view-observations", "Ver observaciones", "Consultar signos vitales y valores de laboratorio"),
    ("edit-observations", "Editar observaciones", "Registrar signos vitales y valores de laboratorio"),
    ("view-conditions", "Ver diagnósticos", "Consultar diagnósticos y listas de problemas"),
    ("edit-conditions", "Editar diagnósticos", "Registrar diagnósticos y mantener listas de problemas"),
    ("view-procedures", "Ver procedimientos", "Consultar procedimientos realizados"),
    ("edit-procedures", "Editar procedimientos", "Registrar procedimientos realizados"),
    ("view-clinical-documents", "Ver documentos clínicos", "Abrir notas clínicas y adjuntos"),
    ("edit-clinical-documents", "Editar documentos clínicos", "Redactar notas clínicas y subir adjuntos"),
    ("delete-clinical-documents", "Eliminar documentos clínicos", "Eliminar notas clínicas y adjuntos"),
    ("view-medications", "Ver medicamentos", "Consultar recetas"),
    ("prescribe-medications", "Recetar medicamentos", "Crear y modificar recetas"),
    ("view-service-requests", "Ver solicitudes de servicio", "Consultar órdenes de laboratorio e imagen"),
    ("create-service-requests", "Solicitar servicios", "Emitir órdenes de laboratorio e imagen"),
    ("view-diagnostic-reports", "Ver informes diagnósticos", "Consultar resultados de laboratorio e imagen"),
    ("edit-diagnostic-reports", "Editar informes diagnósticos", "Registrar y firmar resultados de laboratorio e imagen"),
    ("view-appointments", "Ver citas", "Consultar citas reservadas"),
    ("manage-appointments", "Gestionar citas", "Reservar y reprogramar citas"),
    ("cancel-appointments", "Cancelar citas", "Cancelar citas reservadas"),
    ("view-schedules", "Ver agendas", "Consultar agendas de profesionales"),
    ("manage-schedules", "Gestionar agendas", "Mantener agendas de profesionales"),
    ("view-invoices", "Ver facturas", "Consultar facturas de pacientes"),
    ("manage-invoices", "Gestionar facturas", "Emitir y ajustar facturas"),
    ("view-claims", "Ver reclamaciones", "Consultar reclamaciones al seguro"),
    ("submit-claims", "Enviar reclamaciones", "Preparar y enviar reclamaciones al seguro"),
    ("view-coverage", "Ver coberturas", "Consultar coberturas de seguro"),
    ("edit-coverage", "Editar coberturas", "Registrar y actualizar coberturas de seguro"),
    ("view-staff", "Ver personal", "Consultar cuentas de profesionales"),
    ("manage-staff", "Gestionar personal", "Crear y actualizar cuentas de profesionales"),
    ("view-staff-roles", "Ver asignaciones", "Consultar asignaciones de profesionales"),
    ("manage-staff-roles", "Gestionar asignaciones", "Asignar profesionales a departamentos y roles"),
    ("view-departments", "Ver departamentos", "Consultar la estructura de departamentos"),
    ("manage-departments", "Gestionar departamentos", "Crear, modificar y eliminar departamentos"),
    ("view-roles", "Ver roles", "Consultar roles y sus permisos"),
    ("manage-roles", "Gestionar roles", "Crear, modificar y eliminar roles"),
    ("view-audit-log", "Ver auditoría", "Consultar el registro de auditoría"),
    ("export-data", "Exportar datos", "Exportar tablas a CSV o Excel"),
];

/// Normalizes a language tag to a supported language (`es-MX` -> `es`).
#[must_use]
pub fn normalize_language(lang: &str) -> &'static str {
    let primary = lang
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|l| *l == primary)
        .unwrap_or(FALLBACK_LANGUAGE)
}

fn texts(lang: &str) -> &'static [Text] {
    match normalize_language(lang) {
        "es" => ES,
        _ => EN,
    }
}

fn lookup(lang: &str, code: &str) -> (String, String) {
    texts(lang)
        .iter()
        .chain(EN.iter())
        .find(|(c, _, _)| *c == code)
        .map(|(_, name, description)| ((*name).to_string(), (*description).to_string()))
        .unwrap_or_else(|| (code.to_string(), String::new()))
}

/// The catalog compiled into the crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinCatalogSource;

impl CatalogSource for BuiltinCatalogSource {
    fn permission_tree(&self, lang: &str) -> PermissionResult<Vec<PermissionCategory>> {
        let tree = CATEGORIES
            .iter()
            .map(|category| {
                let (name, description) = lookup(lang, category.code);
                let permissions = PERMISSIONS
                    .iter()
                    .filter(|p| p.category == category.code)
                    .map(|p| {
                        let (name, description) = lookup(lang, p.code);
                        Permission {
                            code: p.code.to_string(),
                            name,
                            description,
                            category: p.category.to_string(),
                            resource_type: p.resource_type.map(str::to_string),
                            access_level: p.access_level,
                            dependencies: p.dependencies.iter().map(|d| (*d).to_string()).collect(),
                        }
                    })
                    .collect();

                PermissionCategory {
                    code: category.code.to_string(),
                    name,
                    description,
                    display_order: category.display_order,
                    permissions,
                }
            })
            .collect();

        Ok(tree)
    }

    fn name(&self) -> &str {
        "builtin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PermissionCatalog;

    #[test]
    fn test_normalize_language() {
        assert_eq!(normalize_language("es"), "es");
        assert_eq!(normalize_language("es-MX"), "es");
        assert_eq!(normalize_language("EN_us"), "en");
        assert_eq!(normalize_language("ka"), "en");
        assert_eq!(normalize_language(""), "en");
    }

    #[test]
    fn test_every_code_has_english_text() {
        for p in PERMISSIONS {
            assert!(EN.iter().any(|(c, _, _)| *c == p.code), "missing en text for {}", p.code);
        }
        for c in CATEGORIES {
            assert!(
                EN.iter().any(|(code, _, _)| *code == c.code),
                "missing en text for {}",
                c.code
            );
        }
    }

    #[test]
    fn test_every_english_text_is_translated() {
        for (code, _, _) in EN {
            assert!(ES.iter().any(|(c, _, _)| c == code), "missing es text for {code}");
        }
    }

    #[test]
    fn test_builtin_catalog_is_valid() {
        let tree = BuiltinCatalogSource.permission_tree("en").unwrap();
        let catalog = PermissionCatalog::from_categories("en", tree).unwrap();
        assert_eq!(catalog.len(), PERMISSIONS.len());
        for p in PERMISSIONS {
            for dep in p.dependencies {
                assert!(catalog.contains(dep), "{} depends on unknown {}", p.code, dep);
            }
        }
    }

    #[test]
    fn test_languages_share_graph_shape() {
        let en = BuiltinCatalogSource.permission_tree("en").unwrap();
        let es = BuiltinCatalogSource.permission_tree("es").unwrap();

        fn shape(
            tree: &[PermissionCategory],
        ) -> Vec<(String, Option<String>, AccessLevel, Vec<String>)> {
            tree.iter()
                .flat_map(|c| c.permissions.iter())
                .map(|p| {
                    (
                        p.code.clone(),
                        p.resource_type.clone(),
                        p.access_level,
                        p.dependencies.clone(),
                    )
                })
                .collect()
        }
        assert_eq!(shape(&en), shape(&es));
        assert_ne!(en[0].name, es[0].name);
    }

    #[test]
    fn test_spanish_display_strings() {
        let es = BuiltinCatalogSource.permission_tree("es-ES").unwrap();
        let patient = es.iter().find(|c| c.code == "patient-management").unwrap();
        assert_eq!(patient.name, "Gestión de pacientes");
        assert_eq!(patient.permissions[0].name, "Ver lista de pacientes");
    }
}
