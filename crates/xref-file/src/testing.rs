//! 测试用容器构建器
//!
//! 生成与真实 `.FCStd` 文件结构相同的描述文件和形状条目。

use quick_xml::escape::escape;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// 最小的 BREP 文本数据
pub const SAMPLE_BREP: &[u8] = b"DBRep_DrawableShape\n\n\
CASCADE Topology V1, (c) Matra-Datavision\n\
Locations 0\n\
Curve2ds 0\n\
Curves 0\n\
Polygon3D 0\n\
PolygonOnTriangulations 0\n\
Surfaces 0\n\
Triangulations 0\n\
\n\
TShapes 1\n\
Ve\n\
1e-07\n\
0 0 0\n\
0 0\n\
\n\
0101101\n\
*\n\
+1 0 \n";

enum FixtureObject {
    /// 带形状的对象；`data` 为 None 时只写描述不写条目
    Shaped {
        label: String,
        blob_path: String,
        data: Option<Vec<u8>>,
    },
    /// 只有标签没有形状的对象（如电子表格）
    Unshaped { label: String },
}

/// 容器文件构建器
pub struct ContainerBuilder {
    objects: Vec<FixtureObject>,
    descriptor: Option<String>,
    with_descriptor: bool,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self {
            objects: Vec::new(),
            descriptor: None,
            with_descriptor: true,
        }
    }

    /// 添加一个带形状数据的部件
    pub fn part(mut self, label: &str, blob_path: &str, data: impl Into<Vec<u8>>) -> Self {
        self.objects.push(FixtureObject::Shaped {
            label: label.to_string(),
            blob_path: blob_path.to_string(),
            data: Some(data.into()),
        });
        self
    }

    /// 添加一个在描述文件中登记、但归档里没有对应条目的部件
    pub fn indexed_only(mut self, label: &str, blob_path: &str) -> Self {
        self.objects.push(FixtureObject::Shaped {
            label: label.to_string(),
            blob_path: blob_path.to_string(),
            data: None,
        });
        self
    }

    /// 添加一个没有形状的对象
    pub fn unshaped(mut self, label: &str) -> Self {
        self.objects.push(FixtureObject::Unshaped {
            label: label.to_string(),
        });
        self
    }

    /// 用原始文本替换生成的描述文件
    pub fn descriptor(mut self, xml: impl Into<String>) -> Self {
        self.descriptor = Some(xml.into());
        self
    }

    /// 不写入描述文件
    pub fn without_descriptor(mut self) -> Self {
        self.with_descriptor = false;
        self
    }

    /// 生成描述文件文本
    pub fn document_xml(&self) -> String {
        if let Some(xml) = &self.descriptor {
            return xml.clone();
        }

        let mut xml = String::new();
        xml.push_str("<?xml version='1.0' encoding='utf-8'?>\n");
        xml.push_str("<Document SchemaVersion=\"4\" ProgramVersion=\"0.18R4\" FileVersion=\"1\">\n");
        xml.push_str("    <Properties Count=\"1\">\n");
        xml.push_str("        <Property name=\"Label\" type=\"App::PropertyString\">\n");
        xml.push_str("            <String value=\"Unnamed\"/>\n");
        xml.push_str("        </Property>\n");
        xml.push_str("    </Properties>\n");
        xml.push_str(&format!("    <ObjectData Count=\"{}\">\n", self.objects.len()));

        for (i, object) in self.objects.iter().enumerate() {
            xml.push_str(&format!("        <Object name=\"Object{:03}\">\n", i));
            match object {
                FixtureObject::Shaped {
                    label, blob_path, ..
                } => {
                    xml.push_str("            <Properties Count=\"3\">\n");
                    push_label(&mut xml, label);
                    xml.push_str("                <Property name=\"Placement\" type=\"App::PropertyPlacement\">\n");
                    xml.push_str("                    <PropertyPlacement Px=\"0\" Py=\"0\" Pz=\"0\" Q0=\"0\" Q1=\"0\" Q2=\"0\" Q3=\"1\" A=\"0\" Ox=\"0\" Oy=\"0\" Oz=\"1\"/>\n");
                    xml.push_str("                </Property>\n");
                    xml.push_str("                <Property name=\"Shape\" type=\"Part::PropertyPartShape\">\n");
                    xml.push_str(&format!(
                        "                    <Part file=\"{}\"/>\n",
                        escape(blob_path.as_str())
                    ));
                    xml.push_str("                </Property>\n");
                }
                FixtureObject::Unshaped { label } => {
                    xml.push_str("            <Properties Count=\"1\">\n");
                    push_label(&mut xml, label);
                }
            }
            xml.push_str("            </Properties>\n");
            xml.push_str("        </Object>\n");
        }

        xml.push_str("    </ObjectData>\n");
        xml.push_str("</Document>\n");
        xml
    }

    /// 写出容器文件
    pub fn write(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut zip = ZipWriter::new(File::create(path)?);
        let options = SimpleFileOptions::default();

        if self.with_descriptor {
            zip.start_file("Document.xml", options)
                .map_err(io::Error::other)?;
            zip.write_all(self.document_xml().as_bytes())?;
        }

        for object in &self.objects {
            if let FixtureObject::Shaped {
                blob_path,
                data: Some(data),
                ..
            } = object
            {
                zip.start_file(blob_path.as_str(), options)
                    .map_err(io::Error::other)?;
                zip.write_all(data)?;
            }
        }

        zip.finish().map_err(io::Error::other)?;
        Ok(())
    }
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn push_label(xml: &mut String, label: &str) {
    xml.push_str("                <Property name=\"Label\" type=\"App::PropertyString\">\n");
    xml.push_str(&format!(
        "                    <String value=\"{}\"/>\n",
        escape(label)
    ));
    xml.push_str("                </Property>\n");
}
