/// Parser for OpenCover XML coverage reports.
///
/// OpenCover structure:
///   <CoverageSession>
///     <Modules>
///       <Module>
///         <Files>
///           <File uid="1" fullPath="C:\src\Calc.cs" />
///         </Files>
///         <Classes><Class><Methods>
///           <Method>
///             <FileRef uid="1" />
///             <SequencePoints>
///               <SequencePoint vc="3" sl="12" ... />
///             </SequencePoints>
///           </Method>
///         </Methods></Class></Classes>
///       </Module>
///     </Modules>
///   </CoverageSession>
///
/// A `FileRef` sets the file that following sequence points belong to.
use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use super::xml::XmlCursor;
use super::{hit_count, line_number, CoverageParser};
use crate::error::Result;
use crate::model::Coverage;
use crate::paths;

pub struct OpenCoverParser;

impl CoverageParser for OpenCoverParser {
    fn parse(&self, path: &Path, coverage: &mut Coverage) -> Result<()> {
        info!("Parsing the OpenCover report {}", paths::absolute(path).display());
        let mut cursor = XmlCursor::open(path)?;
        cursor.require_root_tag("CoverageSession")?;

        let mut files: HashMap<String, Option<String>> = HashMap::new();
        let mut file_ref: Option<String> = None;

        while let Some(tag) = cursor.next_tag()? {
            match tag.as_str() {
                "File" => {
                    let uid = cursor.require_attribute("uid")?;
                    let full_path = cursor.require_attribute("fullPath")?;
                    let canonical = match paths::canonical(full_path) {
                        Ok(p) => Some(p),
                        Err(e) => {
                            debug!(
                                "Skipping the import of OpenCover code coverage for the invalid file path: {} at line {}: {}",
                                full_path,
                                cursor.line(),
                                e
                            );
                            None
                        }
                    };
                    files.insert(uid.to_string(), canonical);
                }
                "FileRef" => {
                    file_ref = Some(cursor.require_attribute("uid")?.to_string());
                }
                "SequencePoint" => {
                    let line = cursor.require_int_attribute("sl")?;
                    let vc = cursor.require_int_attribute("vc")?;

                    let file = file_ref
                        .as_ref()
                        .and_then(|uid| files.get(uid))
                        .and_then(Option::as_ref);
                    if let (Some(file), Some(line), Some(hits)) =
                        (file, line_number(line), hit_count(vc))
                    {
                        coverage.add_hits(file, line, hits);
                    }
                }
                _ => {}
            }
        }

        Ok(())
    }
}
