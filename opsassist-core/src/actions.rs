use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- Parameter Model ---

/// Input kind of a single action parameter. Masking, fill rules, and
/// validation all dispatch on this tag; parameter names carry no special
/// meaning anywhere in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Text,
    Select,
    Checkbox,
    Date,
}

impl Default for ParameterKind {
    fn default() -> Self {
        Self::Text
    }
}

/// One choice of a `Select` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Declares a single form field of an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    /// Placeholder token in the prompt template and form-field key.
    pub name: String,
    pub label: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub kind: ParameterKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
}

fn default_required() -> bool {
    true
}

impl ParameterSpec {
    fn text(name: &str, label: &str, placeholder: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            placeholder: placeholder.to_string(),
            required: true,
            kind: ParameterKind::Text,
            options: Vec::new(),
        }
    }

    fn select(name: &str, label: &str, placeholder: &str, options: &[(&str, &str)]) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            placeholder: placeholder.to_string(),
            required: true,
            kind: ParameterKind::Select,
            options: options
                .iter()
                .map(|(value, label)| SelectOption {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
        }
    }

    fn checkbox(name: &str, label: &str, placeholder: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            placeholder: placeholder.to_string(),
            required: false,
            kind: ParameterKind::Checkbox,
            options: Vec::new(),
        }
    }

    fn date(name: &str, label: &str, placeholder: &str) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            placeholder: placeholder.to_string(),
            required: true,
            kind: ParameterKind::Date,
            options: Vec::new(),
        }
    }
}

// --- Action Model ---

/// A predefined operation the user can invoke from the UI. Catalog entries
/// are compiled in and never mutated at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionDefinition {
    pub id: String,
    pub label: String,
    /// Short wire token consumed by the external action endpoint.
    pub value: String,
    /// Styling tag, carried through to recent-action entries untouched.
    pub class_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tooltip: String,
    /// Template with `{name}` placeholder tokens. Substitution is a literal
    /// string replace; an unmatched token ships verbatim.
    pub prompt_template: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterSpec>,
}

impl ActionDefinition {
    /// True when invoking this action opens a parameter form first.
    pub fn requires_parameters(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// Parameter values captured from a submitted form, keyed by parameter name.
pub type ActionData = HashMap<String, String>;

// --- Builtin Catalog ---

/// The full catalog, in display order: the VM lifecycle family first, then
/// the shipping family.
pub fn builtin_actions() -> Vec<ActionDefinition> {
    vec![
        ActionDefinition {
            id: "start-vm".to_string(),
            label: "Start VM".to_string(),
            value: "start".to_string(),
            class_name: "bg-green-500 hover:bg-green-600 dark:bg-green-600 dark:hover:bg-green-700 text-white".to_string(),
            tooltip: String::new(),
            prompt_template: "Can you start VM {vmName} in resource group {resourceGroup}?".to_string(),
            parameters: vec![
                ParameterSpec::text("vmName", "VM Name", "Enter VM name"),
                ParameterSpec::text("resourceGroup", "Resource Group", "Enter resource group"),
            ],
        },
        ActionDefinition {
            id: "stop-vm".to_string(),
            label: "Stop VM".to_string(),
            value: "shutdown".to_string(),
            class_name: "bg-red-500 hover:bg-red-600 dark:bg-red-600 dark:hover:bg-red-700 text-white".to_string(),
            tooltip: String::new(),
            prompt_template: "Can you stop VM {vmName} in resource group {resourceGroup}?".to_string(),
            parameters: vec![
                ParameterSpec::text("vmName", "VM Name", "Enter VM name"),
                ParameterSpec::text("resourceGroup", "Resource Group", "Enter resource group"),
            ],
        },
        ActionDefinition {
            id: "list-vms".to_string(),
            label: "List VMs".to_string(),
            value: "list".to_string(),
            class_name: "bg-blue-500 hover:bg-blue-600 dark:bg-blue-600 dark:hover:bg-blue-700 text-white".to_string(),
            tooltip: String::new(),
            prompt_template: "Can you list all VMs?".to_string(),
            parameters: vec![],
        },
        ActionDefinition {
            id: "restart-vm".to_string(),
            label: "Restart VM".to_string(),
            value: "restart".to_string(),
            class_name: "bg-orange-500 hover:bg-orange-600 dark:bg-orange-600 dark:hover:bg-orange-700 text-white".to_string(),
            tooltip: String::new(),
            prompt_template: "Can you restart VM {vmName} in resource group {resourceGroup}?".to_string(),
            parameters: vec![
                ParameterSpec::text("vmName", "VM Name", "Enter VM name"),
                ParameterSpec::text("resourceGroup", "Resource Group", "Enter resource group"),
            ],
        },
        ActionDefinition {
            id: "create-label".to_string(),
            label: "Create Label for Order".to_string(),
            value: "create-label".to_string(),
            class_name: "bg-green-500 hover:bg-green-600 dark:bg-green-600 dark:hover:bg-green-700 text-white".to_string(),
            tooltip: "Create a shipping label for a specific order".to_string(),
            prompt_template: "Create a shipping label for order {orderNumber} with delivery in {deliverySpeed} days{cheapestCarrierText}".to_string(),
            parameters: vec![
                ParameterSpec::text("orderNumber", "Order Number", "Enter order number"),
                ParameterSpec::text("deliverySpeed", "Delivery Speed (days)", "Select delivery speed"),
                ParameterSpec::checkbox("cheapestCarrier", "Use cheapest carrier", "Check for cheapest option"),
            ],
        },
        ActionDefinition {
            id: "rate-shop".to_string(),
            label: "Rate Shop".to_string(),
            value: "rate-shop".to_string(),
            class_name: "bg-red-500 hover:bg-red-600 dark:bg-red-600 dark:hover:bg-red-700 text-white".to_string(),
            tooltip: "Compare shipping rates for a package".to_string(),
            prompt_template: "Rate shop for a {weightValue} {weightUnit} package with dimensions {length}x{width}x{height} {dimensionUnit}, shipping from {fromAddress}, {fromCity}, {fromState} {fromZip} to {toAddress}, {toCity}, {toState} {toZip} in {countryCode}".to_string(),
            parameters: vec![
                ParameterSpec::text("weightValue", "Package Weight", "Enter package weight"),
                ParameterSpec::select(
                    "weightUnit",
                    "Weight Unit",
                    "Select weight unit",
                    &[("lb", "Pounds (lb)"), ("kg", "Kilograms (kg)"), ("oz", "Ounces (oz)")],
                ),
                ParameterSpec::text("length", "Length", "Enter length"),
                ParameterSpec::text("width", "Width", "Enter width"),
                ParameterSpec::text("height", "Height", "Enter height"),
                ParameterSpec::select(
                    "dimensionUnit",
                    "Dimension Unit",
                    "Select dimension unit",
                    &[("in", "Inches (in)"), ("cm", "Centimeters (cm)")],
                ),
                ParameterSpec::text("fromAddress", "Origin Address", "Enter street address"),
                ParameterSpec::text("fromCity", "Origin City", "Enter city"),
                ParameterSpec::text("fromState", "Origin State/Province", "Enter state/province"),
                ParameterSpec::text("fromZip", "Origin ZIP/Postal Code", "Enter ZIP/postal code"),
                ParameterSpec::text("toAddress", "Destination Address", "Enter street address"),
                ParameterSpec::text("toCity", "Destination City", "Enter city"),
                ParameterSpec::text("toState", "Destination State/Province", "Enter state/province"),
                ParameterSpec::text("toZip", "Destination ZIP/Postal Code", "Enter ZIP/postal code"),
                ParameterSpec::select(
                    "countryCode",
                    "Country Code",
                    "Enter 2-letter country code (e.g., US, CA)",
                    &[
                        ("US", "United States (US)"),
                        ("CA", "Canada (CA)"),
                        ("MX", "Mexico (MX)"),
                        ("GB", "United Kingdom (GB)"),
                    ],
                ),
            ],
        },
        ActionDefinition {
            id: "rate-shop-order".to_string(),
            label: "Rate Shop Order".to_string(),
            value: "rate-shop-order".to_string(),
            class_name: "bg-blue-500 hover:bg-blue-600 dark:bg-blue-600 dark:hover:bg-blue-700 text-white".to_string(),
            tooltip: "Find shipping rates for an existing order".to_string(),
            prompt_template: "Can you rate shop for order {orderNumber}{deliveryDateText}".to_string(),
            parameters: vec![
                ParameterSpec::text("orderNumber", "Order Number", "Enter order number"),
                ParameterSpec::date("deliveryDate", "Delivery Date", "Enter delivery date"),
            ],
        },
        ActionDefinition {
            id: "generate-label".to_string(),
            label: "Generate Label".to_string(),
            value: "generate-label".to_string(),
            class_name: "bg-orange-500 hover:bg-orange-600 dark:bg-orange-600 dark:hover:bg-orange-700 text-white".to_string(),
            tooltip: "Generate a shipping label for a package".to_string(),
            prompt_template: "Generate a shipping label for order {orderNumber} using {carrierService}".to_string(),
            parameters: vec![
                ParameterSpec::text("orderNumber", "Order Number", "Enter order number"),
                ParameterSpec::select(
                    "carrierService",
                    "Carrier Service",
                    "Select carrier service",
                    &[
                        ("ups-ground", "UPS Ground"),
                        ("ups-2day", "UPS 2nd Day Air"),
                        ("ups-overnight", "UPS Next Day Air"),
                        ("fedex-ground", "FedEx Ground"),
                        ("fedex-2day", "FedEx 2Day"),
                        ("fedex-overnight", "FedEx Priority Overnight"),
                        ("usps-ground", "USPS Ground Advantage"),
                        ("usps-priority", "USPS Priority Mail"),
                        ("usps-express", "USPS Priority Mail Express"),
                    ],
                ),
            ],
        },
    ]
}

pub fn find_action(id: &str) -> Option<ActionDefinition> {
    let id_norm = id.trim().to_lowercase();
    builtin_actions().into_iter().find(|a| a.id == id_norm)
}
