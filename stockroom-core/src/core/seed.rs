//! Starter records for a freshly created inventory.

use crate::{
    Category, CustomField, Inventory, Manufacturer, Package, PackageType, Part, Result, Supplier,
};

/// `(name, parent, alias)`, parents listed before their children.
const CATEGORIES: &[(&str, Option<&str>, Option<&str>)] = &[
    ("Resistors", None, None),
    ("Variable Resistors", Some("Resistors"), None),
    ("Capacitors", None, None),
    ("Electrolytic Caps", Some("Capacitors"), None),
    ("Tantalum Caps", Some("Capacitors"), None),
    ("Ceramic Caps", Some("Capacitors"), None),
    ("Inductors", None, None),
    ("Crystals", None, None),
    ("Oscillators", None, None),
    ("Diodes", None, None),
    ("LED", Some("Diodes"), None),
    ("TVS", Some("Diodes"), None),
    ("MCU", None, Some("Microcontroller")),
    ("PMIC", None, Some("Power Management IC")),
    ("LDO Regulators", Some("PMIC"), None),
    ("DC-DC Regulators", Some("PMIC"), None),
    ("Buck Converters", Some("DC-DC Regulators"), None),
    ("Boost Converters", Some("DC-DC Regulators"), None),
    ("Connectors", None, None),
    ("Buttons", None, None),
    ("Transistors", None, None),
    ("N-MOSFETs", Some("Transistors"), None),
    ("P-MOSFETs", Some("Transistors"), None),
    ("Modules", None, None),
];

const PACKAGES: &[(&str, PackageType)] = &[
    ("SMD 0201", PackageType::Smt),
    ("SMD 0402", PackageType::Smt),
    ("SMD 0603", PackageType::Smt),
    ("SMD 0805", PackageType::Smt),
    ("SMD 1206", PackageType::Smt),
    ("SOT-23", PackageType::Smt),
    ("SOT-23-5", PackageType::Smt),
    ("SOIC-8", PackageType::Smt),
    ("QFN-56", PackageType::Smt),
    ("TO-92", PackageType::Tht),
    ("TO-220", PackageType::Tht),
];

/// `(name, alias, url)`
const MANUFACTURERS: &[(&str, Option<&str>, &str)] = &[
    ("Raspberry Pi", None, "https://www.raspberrypi.com/"),
    ("Texas Instruments", Some("TI"), "https://www.ti.com/"),
    ("Analog Devices", Some("ADI"), "https://www.analog.com/en/index.html"),
    ("STMicroelectronics", Some("ST"), "https://www.st.com/content/st_com/en.html"),
    ("Microchip", None, "https://www.microchip.com/"),
    ("Infineon", None, "https://www.infineon.com/"),
    ("ON Semiconductor", Some("Onsemi"), "https://www.onsemi.com/"),
    ("ROHM", None, "https://www.rohm.com/"),
];

fn sample_part() -> Part {
    let mut part = Part::new("RP2040", "MCU", 15);
    part.alias = Some("RPi RP2040".to_string());
    part.package = Some("QFN-56".to_string());
    part.package_detail = Some("7x7mm P0.4mm 1EP3.2x3.2mm".to_string());
    part.mfr = Some("Raspberry Pi".to_string());
    part.mfr_no = Some("SC0914(7)".to_string());
    part.datasheet_link =
        Some("https://datasheets.raspberrypi.com/rp2040/rp2040-datasheet.pdf".to_string());
    part.product_link = Some(
        "https://www.raspberrypi.com/documentation/microcontrollers/rp2040.html".to_string(),
    );
    part.description = Some("Dual ARM Cortex-M0+ 133MHz, 264KB SRAM".to_string());
    part.location = Some("Box #1".to_string());
    part.custom_fields = vec![CustomField {
        name: "Mouser #".to_string(),
        field_type: "normal".to_string(),
        value: "358-SC09147".to_string(),
    }];
    part.suppliers = vec![Supplier {
        name: "Mouser".to_string(),
        link: "https://www.mouser.com/ProductDetail/Raspberry-Pi/SC09147".to_string(),
        price: Some(0.8),
        note: "7' reel".to_string(),
    }];
    part
}

/// Adds the starter categories, packages, manufacturers and one sample part.
///
/// Records whose name is already taken are left alone, so seeding an
/// inventory twice is harmless. Returns the number of records added.
///
/// # Errors
///
/// Only storage failures are returned.
pub fn seed_defaults(inventory: &Inventory) -> Result<usize> {
    let mut added = 0;
    let mut tally = |outcome: Result<()>| -> Result<()> {
        match outcome {
            Ok(()) => {
                added += 1;
                Ok(())
            }
            Err(e) if e.is_storage_failure() => Err(e),
            Err(e) => {
                log::debug!("seed record skipped: {e}");
                Ok(())
            }
        }
    };

    for &(name, parent, alias) in CATEGORIES {
        tally(inventory.add_category(Category::new(name, parent, alias)))?;
    }
    for &(name, pkg_type) in PACKAGES {
        tally(inventory.add_package(Package::new(name, pkg_type, None)))?;
    }
    for &(name, alias, url) in MANUFACTURERS {
        tally(inventory.add_manufacturer(Manufacturer::new(name, alias, Some(url))))?;
    }
    tally(inventory.add_part(sample_part()))?;

    log::info!("seeded {added} default records");
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_seed_populates_tree() {
        let temp = NamedTempFile::new().unwrap();
        let inv = Inventory::create(temp.path()).unwrap();

        let added = seed_defaults(&inv).unwrap();
        assert_eq!(
            added,
            CATEGORIES.len() + PACKAGES.len() + MANUFACTURERS.len() + 1
        );
        assert_eq!(
            inv.category_ancestors("Buck Converters").unwrap(),
            ["DC-DC Regulators", "PMIC"]
        );
        assert_eq!(inv.get_part("RP2040").unwrap().quantity, 15);
    }

    #[test]
    fn test_seed_twice_adds_nothing() {
        let temp = NamedTempFile::new().unwrap();
        let inv = Inventory::create(temp.path()).unwrap();
        seed_defaults(&inv).unwrap();
        assert_eq!(seed_defaults(&inv).unwrap(), 0);
        assert_eq!(inv.list_packages().len(), PACKAGES.len());
    }
}
