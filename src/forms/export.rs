use super::models::Model as Form;
use crate::bacteria::readings::MicroField;
use crate::common::dates::format_date;
use crate::common::errors::BusinessError;
use crate::samples::models::Model as Sample;

const HEADER: [&str; 24] = [
    "report_title",
    "brand",
    "site",
    "form_status",
    "number",
    "product",
    "ready_time",
    "fabrication",
    "dlc",
    "smell",
    "texture",
    "taste",
    "aspect",
    "ph",
    "enterobacteria",
    "yeast_mold",
    "coliforms_count",
    "staphylococcus_count",
    "listeria_count",
    "escherichia_coli_count",
    "total_flora_count",
    "leuconostoc_count",
    "status",
    "lab_comment",
];

const RESULT_FIELDS: [MicroField; 8] = [
    MicroField::Enterobacteria,
    MicroField::YeastMold,
    MicroField::Coliforms,
    MicroField::Staphylococcus,
    MicroField::Listeria,
    MicroField::EscherichiaColi,
    MicroField::TotalFlora,
    MicroField::Leuconostoc,
];

fn export_error(err: impl std::fmt::Display) -> BusinessError {
    BusinessError::InternalError {
        message: format!("CSV export failed: {err}"),
    }
}

/// One row per sample; dates always ISO, unread results left blank
pub fn samples_to_csv(form: &Form, samples: &[Sample]) -> Result<Vec<u8>, BusinessError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(HEADER).map_err(export_error)?;

    for sample in samples {
        let mut record = vec![
            form.report_title.clone(),
            form.brand.clone(),
            form.site.clone(),
            form.status.to_string(),
            sample.number.clone(),
            sample.product.clone(),
            sample.ready_time.clone().unwrap_or_default(),
            sample.fabrication.map(format_date).unwrap_or_default(),
            sample.dlc.map(format_date).unwrap_or_default(),
            sample.smell.code().to_string(),
            sample.texture.code().to_string(),
            sample.taste.code().to_string(),
            sample.aspect.code().to_string(),
            sample.ph.clone().unwrap_or_default(),
        ];
        record.extend(
            RESULT_FIELDS
                .iter()
                .map(|field| field.read(sample).unwrap_or_default()),
        );
        record.push(sample.status.to_string());
        record.push(sample.lab_comment.clone().unwrap_or_default());
        writer.write_record(&record).map_err(export_error)?;
    }

    writer.into_inner().map_err(export_error)
}
