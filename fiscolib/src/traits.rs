//! Трэйты на стыках: чтение таблицы из файла и отправка пакета.

use crate::{
    error::Result,
    ingest::RawTable,
    payload::{Payload, SubmissionResponse},
};
use std::io::Read;

pub trait ReadTable {
    fn read<R: Read>(r: R) -> Result<RawTable>;
}

/// Внешняя точка сохранения пакета. Один вызов на пакет, без повторов.
pub trait SubmissionEndpoint {
    fn submit(&mut self, payload: &Payload) -> Result<SubmissionResponse>;
}
